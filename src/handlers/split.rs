use axum::{
    extract::{Multipart, State},
    http::{HeaderName, HeaderValue},
    response::Response,
};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::handlers::download::{attachment, PDF_CONTENT_TYPE, ZIP_CONTENT_TYPE};
use crate::handlers::upload::read_upload_form;
use crate::handlers::AppState;
use crate::models::{PageSelection, SplitMode, UploadedFile};
use crate::services::{create_zip, PdfProcessor};

pub const FILE_COUNT_HEADER: &str = "x-file-count";

/// Split one uploaded PDF into single-page files, returned as a ZIP.
///
/// Form fields: `file`, `mode` (`all` or `range`) and `pages`, a 1-based
/// range expression such as `1-3, 5` that is required in range mode. A `page`
/// field asks for that one page as a plain PDF instead of the archive.
pub async fn split_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    info!(request_id = %request_id, "Starting PDF split request");

    let mut form = read_upload_form(&mut multipart, &state.config).await?;
    let file = form.take_file()?;

    if let Some(page) = form.field("page") {
        let page_number = page
            .parse::<usize>()
            .map_err(|_| {
                AppError::validation(format!("page must be a page number, got '{}'", page))
            })?;
        return single_page(&request_id, start, file, page_number).await;
    }

    let mode = form.field("mode").map(SplitMode::from_form_value).unwrap_or_default();
    let selection = match mode {
        SplitMode::All => PageSelection::All,
        SplitMode::Range => match form.field("pages") {
            Some(pages) => PageSelection::Range(pages.to_string()),
            None => return Err(AppError::validation("Please enter a page range, e.g. 1-3, 5")),
        },
    };

    info!(
        request_id = %request_id,
        file_name = %file.name,
        file_size = file.size,
        selection = ?selection,
        "Splitting PDF"
    );

    let download_name = format!("{}_pages.zip", file.stem());
    let content = file.content;
    let archive = tokio::task::spawn_blocking(move || -> AppResult<(usize, Vec<u8>)> {
        let pages = PdfProcessor::new().split(&content, &selection)?;
        Ok((pages.len(), create_zip(&pages)?))
    })
    .await?;

    let (file_count, archive) = match archive {
        Ok(result) => result,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "PDF split failed");
            return Err(e);
        }
    };

    let mut response = attachment(archive, ZIP_CONTENT_TYPE, &download_name)?;
    response
        .headers_mut()
        .insert(HeaderName::from_static(FILE_COUNT_HEADER), HeaderValue::from(file_count));

    info!(
        request_id = %request_id,
        files = file_count,
        total_time_ms = start.elapsed().as_millis() as u64,
        "Split request completed"
    );

    Ok(response)
}

/// The `page_number`-th page of `file`, downloaded as `<stem>_page_<N>.pdf`.
async fn single_page(
    request_id: &str,
    start: Instant,
    file: UploadedFile,
    page_number: usize,
) -> AppResult<Response> {
    info!(
        request_id = %request_id,
        file_name = %file.name,
        page = page_number,
        "Extracting single page"
    );

    let stem = file.stem().to_string();
    let content = file.content;
    let page = tokio::task::spawn_blocking(move || {
        PdfProcessor::new().extract_page(&content, page_number)
    })
    .await?;

    let page = match page {
        Ok(page) => page,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Page extraction failed");
            return Err(e);
        }
    };

    info!(
        request_id = %request_id,
        page = page_number,
        size = page.content.len(),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Single page request completed"
    );

    let download_name = format!("{}_{}", stem, page.filename);
    attachment(page.content, PDF_CONTENT_TYPE, &download_name)
}
