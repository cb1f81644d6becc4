use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::CompressionResult;

/// Downsample resolutions tried by the target-size search, best quality first.
pub const SEARCH_DPI_STEPS: [u32; 6] = [150, 100, 72, 50, 36, 24];

/// JPEG quality factors tried for each resolution, best quality first.
pub const SEARCH_QUALITY_STEPS: [u8; 4] = [60, 40, 20, 10];

/// Ghostscript `-dPDFSETTINGS` preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfPreset {
    Prepress,
    Ebook,
    Screen,
}

impl PdfPreset {
    pub fn as_flag_value(&self) -> &'static str {
        match self {
            PdfPreset::Prepress => "/prepress",
            PdfPreset::Ebook => "/ebook",
            PdfPreset::Screen => "/screen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionParams {
    pub dpi: u32,
    pub jpeg_quality: u8,
    pub preset: PdfPreset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Low,
        QualityTier::Medium,
        QualityTier::High,
        QualityTier::Extreme,
    ];

    /// Unknown names resolve to the default tier.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "low" => QualityTier::Low,
            "medium" => QualityTier::Medium,
            "high" => QualityTier::High,
            "extreme" => QualityTier::Extreme,
            other => {
                debug!(tier = other, "Unknown quality tier, using default");
                QualityTier::default()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Extreme => "extreme",
        }
    }

    pub fn params(&self) -> CompressionParams {
        match self {
            QualityTier::Low => CompressionParams {
                dpi: 300,
                jpeg_quality: 95,
                preset: PdfPreset::Prepress,
            },
            QualityTier::Medium => CompressionParams {
                dpi: 150,
                jpeg_quality: 75,
                preset: PdfPreset::Ebook,
            },
            QualityTier::High => CompressionParams {
                dpi: 72,
                jpeg_quality: 40,
                preset: PdfPreset::Screen,
            },
            QualityTier::Extreme => CompressionParams {
                dpi: 50,
                jpeg_quality: 20,
                preset: PdfPreset::Screen,
            },
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An external PDF compressor.
///
/// Implementations report every failure as an error; the fallback to the
/// original bytes lives in [`CompressionService`].
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    async fn compress(&self, input: &[u8], params: &CompressionParams) -> AppResult<Vec<u8>>;

    /// Whether the underlying tool can be launched at all.
    fn is_available(&self) -> bool;
}

/// How a compression request picks its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionTarget {
    Tier(QualityTier),
    /// Search the parameter grid for an output of at most this many bytes,
    /// using the tier's preset.
    MaxBytes { tier: QualityTier, target_bytes: usize },
}

impl CompressionTarget {
    /// A missing or non-positive megabyte target means "use the tier".
    pub fn from_form(tier: QualityTier, target_size_mb: Option<f64>) -> Self {
        match target_size_mb {
            Some(mb) if mb.is_finite() && mb > 0.0 => CompressionTarget::MaxBytes {
                tier,
                target_bytes: (mb * 1024.0 * 1024.0) as usize,
            },
            _ => CompressionTarget::Tier(tier),
        }
    }
}

#[derive(Clone)]
pub struct CompressionService {
    compressor: Arc<dyn PdfCompressor>,
}

impl CompressionService {
    pub fn new(compressor: Arc<dyn PdfCompressor>) -> Self {
        Self { compressor }
    }

    pub fn is_available(&self) -> bool {
        self.compressor.is_available()
    }

    /// Compress `input` according to `target`. Never fails and never returns
    /// more bytes than it was given.
    pub async fn compress(
        &self,
        input: &[u8],
        target: CompressionTarget,
    ) -> (Vec<u8>, CompressionResult) {
        let start = Instant::now();
        let original_size = input.len();

        let output = match target {
            CompressionTarget::Tier(tier) => {
                info!(tier = %tier, original_size, "Compressing with quality tier");
                self.compress_once(input, &tier.params()).await
            }
            CompressionTarget::MaxBytes { tier, target_bytes } => {
                info!(tier = %tier, original_size, target_bytes, "Searching for target size");
                self.search_target_size(input, target_bytes, tier.params().preset).await
            }
        };

        let result = CompressionResult::new(original_size, output.len());
        info!(
            original_size = result.original_size,
            compressed_size = result.compressed_size,
            reduction_percent = result.reduction_percent,
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Compression finished"
        );

        (output, result)
    }

    /// One best-effort compressor invocation: any failure, or an output that is
    /// not strictly smaller, yields a copy of the input.
    pub async fn compress_once(&self, input: &[u8], params: &CompressionParams) -> Vec<u8> {
        match self.compressor.compress(input, params).await {
            Ok(output) if output.len() < input.len() => output,
            Ok(output) => {
                debug!(
                    dpi = params.dpi,
                    quality = params.jpeg_quality,
                    input_size = input.len(),
                    output_size = output.len(),
                    "Compressed output is not smaller, keeping original"
                );
                input.to_vec()
            }
            Err(e) => {
                warn!(
                    dpi = params.dpi,
                    quality = params.jpeg_quality,
                    error = %e,
                    "Compressor failed, keeping original"
                );
                input.to_vec()
            }
        }
    }

    /// Walk the resolution x quality grid until an output fits in
    /// `target_bytes`; otherwise return the smallest output seen.
    pub async fn search_target_size(
        &self,
        input: &[u8],
        target_bytes: usize,
        preset: PdfPreset,
    ) -> Vec<u8> {
        let mut best: Option<Vec<u8>> = None;
        let mut attempts = 0usize;

        for dpi in SEARCH_DPI_STEPS {
            for jpeg_quality in SEARCH_QUALITY_STEPS {
                attempts += 1;
                let params = CompressionParams { dpi, jpeg_quality, preset };
                let candidate = self.compress_once(input, &params).await;

                debug!(
                    attempt = attempts,
                    dpi,
                    quality = jpeg_quality,
                    candidate_size = candidate.len(),
                    target_bytes,
                    "Target size candidate"
                );

                if candidate.len() <= target_bytes {
                    info!(
                        attempts,
                        dpi,
                        quality = jpeg_quality,
                        size = candidate.len(),
                        "Target size reached"
                    );
                    return candidate;
                }

                if best.as_ref().map_or(true, |b| candidate.len() < b.len()) {
                    best = Some(candidate);
                }
            }
        }

        info!(attempts, target_bytes, "Target size not reachable, returning smallest result");
        best.unwrap_or_else(|| input.to_vec())
    }
}
