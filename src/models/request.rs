use serde::{Deserialize, Serialize};

/// A PDF received through a multipart form field.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: usize,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: String, content: Vec<u8>) -> Self {
        let size = content.len();
        Self {
            name,
            size,
            content,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: String) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    pub fn is_pdf(&self) -> bool {
        self.content.starts_with(b"%PDF")
            || self
                .mime_type
                .as_ref()
                .map(|mt| mt == "application/pdf")
                .unwrap_or(false)
            || self.name.to_lowercase().ends_with(".pdf")
    }

    /// File name without its final extension, used to derive download names.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// A filename paired with its bytes. Split output and zip members use this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBlob {
    pub filename: String,
    pub content: Vec<u8>,
}

impl NamedBlob {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One output file per page.
    #[default]
    All,
    /// Only the pages named by a page-range expression.
    Range,
}

impl SplitMode {
    /// Unrecognised values fall back to splitting every page.
    pub fn from_form_value(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "range" => SplitMode::Range,
            _ => SplitMode::All,
        }
    }
}

/// What to extract from a document when splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    All,
    Range(String),
}
