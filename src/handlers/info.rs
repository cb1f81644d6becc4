use axum::{
    extract::{Multipart, State},
    response::Json,
};
use std::time::Instant;
use tracing::info;

use crate::error::AppResult;
use crate::handlers::upload::read_upload_form;
use crate::handlers::AppState;
use crate::models::InfoResponse;
use crate::services::PdfProcessor;

/// Report the page count of an uploaded PDF, so the form can show it before
/// the user picks a page range.
pub async fn info_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<InfoResponse>> {
    let start = Instant::now();

    let mut form = read_upload_form(&mut multipart, &state.config).await?;
    let file = form.take_file()?;

    let content = file.content;
    let pages =
        tokio::task::spawn_blocking(move || PdfProcessor::new().page_count(&content)).await??;

    let processing_time = start.elapsed().as_millis() as u64;
    info!(file_name = %file.name, pages, processing_time_ms = processing_time, "PDF info computed");

    Ok(Json(InfoResponse::new(file.name, file.size, pages, processing_time)))
}
