use axum::{
    extract::{Multipart, State},
    http::{HeaderName, HeaderValue},
    response::Response,
};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::handlers::download::{attachment, PDF_CONTENT_TYPE};
use crate::handlers::upload::read_upload_form;
use crate::handlers::AppState;
use crate::services::{CompressionTarget, QualityTier};

pub const ORIGINAL_SIZE_HEADER: &str = "x-original-size";
pub const COMPRESSED_SIZE_HEADER: &str = "x-compressed-size";
pub const REDUCTION_HEADER: &str = "x-reduction-percent";

/// Compress one uploaded PDF.
///
/// Form fields: `file`, `quality` (`low`/`medium`/`high`/`extreme`) and an
/// optional `target_size_mb` that switches to the target-size search.
pub async fn compress_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    info!(request_id = %request_id, "Starting PDF compression request");

    let mut form = match read_upload_form(&mut multipart, &state.config).await {
        Ok(form) => form,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Failed to read compression form");
            return Err(e);
        }
    };
    let file = form.take_file()?;

    let tier = form
        .field("quality")
        .map(QualityTier::from_name)
        .unwrap_or_default();
    let target_size_mb = form
        .field("target_size_mb")
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| {
                    AppError::validation(format!(
                        "target_size_mb must be a number, got '{}'",
                        value
                    ))
                })
        })
        .transpose()?;
    let target = CompressionTarget::from_form(tier, target_size_mb);

    info!(
        request_id = %request_id,
        file_name = %file.name,
        file_size = file.size,
        target = ?target,
        "Compressing PDF"
    );

    let (compressed, result) = state.compression.compress(&file.content, target).await;

    let download_name = format!("{}_compressed.pdf", file.stem());
    let mut response = attachment(compressed, PDF_CONTENT_TYPE, &download_name)?;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(ORIGINAL_SIZE_HEADER),
        HeaderValue::from(result.original_size),
    );
    headers.insert(
        HeaderName::from_static(COMPRESSED_SIZE_HEADER),
        HeaderValue::from(result.compressed_size),
    );
    headers.insert(
        HeaderName::from_static(REDUCTION_HEADER),
        HeaderValue::from_str(&format!("{:.1}", result.reduction_percent))
            .map_err(|e| AppError::internal(e.to_string()))?,
    );

    info!(
        request_id = %request_id,
        original_size = result.original_size,
        compressed_size = result.compressed_size,
        reduction_percent = result.reduction_percent,
        total_time_ms = start.elapsed().as_millis() as u64,
        "Compression request completed"
    );

    Ok(response)
}
