use axum::{
    extract::{Multipart, State},
    response::Response,
};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::handlers::download::{attachment, PDF_CONTENT_TYPE};
use crate::handlers::upload::read_upload_form;
use crate::handlers::AppState;
use crate::models::format_size;
use crate::services::PdfProcessor;

pub const MIN_MERGE_FILES: usize = 2;
pub const MERGED_FILE_NAME: &str = "merged.pdf";

/// Merge the uploaded PDFs, in upload order, into `merged.pdf`.
pub async fn merge_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    info!(request_id = %request_id, "Starting PDF merge request");

    let form = read_upload_form(&mut multipart, &state.config).await?;
    if form.files.len() < MIN_MERGE_FILES {
        return Err(AppError::NotEnoughFiles {
            required: MIN_MERGE_FILES,
            received: form.files.len(),
        });
    }

    for (position, file) in form.files.iter().enumerate() {
        info!(
            request_id = %request_id,
            position = position + 1,
            file_name = %file.name,
            file_size = %format_size(file.size),
            "Queued for merge"
        );
    }

    let documents: Vec<Vec<u8>> = form.files.into_iter().map(|file| file.content).collect();
    let merged = tokio::task::spawn_blocking(move || PdfProcessor::new().merge(documents)).await?;

    let merged = match merged {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "PDF merge failed");
            return Err(e);
        }
    };

    info!(
        request_id = %request_id,
        merged_size = %format_size(merged.len()),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Merge request completed"
    );

    attachment(merged, PDF_CONTENT_TYPE, MERGED_FILE_NAME)
}
