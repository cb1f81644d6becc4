use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::UploadedFile;

/// Names of the multipart fields that carry PDF uploads.
const FILE_FIELDS: [&str; 2] = ["file", "files"];

/// A parsed multipart form: uploaded PDFs in submission order plus text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Trimmed value of a text field; blank values count as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// The first uploaded file, for endpoints that take exactly one document.
    pub fn take_file(&mut self) -> AppResult<UploadedFile> {
        if self.files.is_empty() {
            return Err(AppError::MissingFile);
        }
        Ok(self.files.remove(0))
    }
}

pub async fn read_upload_form(multipart: &mut Multipart, config: &Config) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, config))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if !FILE_FIELDS.contains(&field_name.as_str()) {
            let value = field.text().await.map_err(|e| multipart_error(e, config))?;
            form.fields.insert(field_name, value);
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field.bytes().await.map_err(|e| multipart_error(e, config))?;

        // Browsers submit an empty, nameless part when no file was chosen
        if data.is_empty() && file_name.is_empty() {
            continue;
        }

        let file_name = if file_name.is_empty() {
            "uploaded.pdf".to_string()
        } else {
            file_name
        };

        if data.is_empty() {
            return Err(AppError::InvalidFile {
                message: format!("{} is empty", file_name),
            });
        }

        if data.len() > config.max_file_size_bytes() {
            return Err(AppError::FileTooLarge {
                size_bytes: data.len(),
                limit: config.max_file_size_mb,
            });
        }

        let mut file = UploadedFile::new(file_name, data.to_vec());
        if let Some(mime_type) = content_type {
            file = file.with_mime_type(mime_type);
        }

        if !file.is_pdf() {
            return Err(AppError::InvalidFile {
                message: format!("{} is not a PDF document", file.name),
            });
        }

        debug!(
            file_name = %file.name,
            file_size = file.size,
            mime_type = ?file.mime_type,
            "Received upload"
        );
        form.files.push(file);
    }

    Ok(form)
}

fn multipart_error(err: MultipartError, config: &Config) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::RequestTooLarge {
            limit: config.max_request_size_mb,
        }
    } else {
        AppError::InvalidFile {
            message: format!("Failed to read multipart form: {}", err.body_text()),
        }
    }
}
