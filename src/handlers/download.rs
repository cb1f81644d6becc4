use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::Response,
};
use bytes::Bytes;

use crate::error::{AppError, AppResult};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// A downloadable response carrying `content` under `filename`.
pub fn attachment(
    content: Vec<u8>,
    content_type: &'static str,
    filename: &str,
) -> AppResult<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(filename))
        .map_err(|e| AppError::internal(format!("Invalid download name: {}", e)))?;

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(Bytes::from(content)))
        .map_err(|e| AppError::internal(format!("Failed to build response: {}", e)))
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// encoded UTF-8 name, so non-Latin file names survive the download.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}
