use serde::{Deserialize, Serialize};

/// Size report for one compression request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    pub original_size: usize,
    pub compressed_size: usize,
    pub reduction_percent: f64,
}

impl CompressionResult {
    pub fn new(original_size: usize, compressed_size: usize) -> Self {
        let reduction_percent = if original_size > 0 {
            (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
        } else {
            0.0
        };

        Self {
            original_size,
            compressed_size,
            reduction_percent,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub success: bool,
    pub data: PdfInfo,
    pub processing_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PdfInfo {
    pub file_name: String,
    pub file_size_bytes: usize,
    pub file_size: String,
    pub pages: usize,
}

impl InfoResponse {
    pub fn new(
        file_name: String,
        file_size_bytes: usize,
        pages: usize,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            data: PdfInfo {
                file_name,
                file_size_bytes,
                file_size: format_size(file_size_bytes),
                pages,
            },
            processing_time_ms,
        }
    }
}

/// Human readable byte count: `B` below 1 KiB, one decimal `KB`, two decimal `MB`.
pub fn format_size(size: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;

    if size < KIB {
        format!("{} B", size)
    } else if size < MIB {
        format!("{:.1} KB", size as f64 / KIB as f64)
    } else {
        format!("{:.2} MB", size as f64 / MIB as f64)
    }
}
