use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::compression::{CompressionParams, PdfCompressor};

/// Runs Ghostscript's `pdfwrite` device as a subprocess.
///
/// Every invocation gets its own temporary directory holding the input and
/// output files; the directory is removed when the call returns, whatever the
/// outcome.
#[derive(Debug, Clone)]
pub struct GhostscriptCompressor {
    binary: String,
    timeout: Duration,
}

impl GhostscriptCompressor {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ghostscript_path.clone(), config.compression_timeout())
    }

    pub fn build_args(params: &CompressionParams, input: &Path, output: &Path) -> Vec<String> {
        let dpi = params.dpi;
        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            format!("-dPDFSETTINGS={}", params.preset.as_flag_value()),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            "-dDetectDuplicateImages=true".to_string(),
            "-dCompressFonts=true".to_string(),
            "-dSubsetFonts=true".to_string(),
            format!("-dColorImageResolution={}", dpi),
            format!("-dGrayImageResolution={}", dpi),
            format!("-dMonoImageResolution={}", dpi),
            "-dColorImageDownsampleType=/Bicubic".to_string(),
            "-dGrayImageDownsampleType=/Bicubic".to_string(),
            "-dMonoImageDownsampleType=/Bicubic".to_string(),
            "-dDownsampleColorImages=true".to_string(),
            "-dDownsampleGrayImages=true".to_string(),
            "-dDownsampleMonoImages=true".to_string(),
            format!("-dJPEGQ={}", params.jpeg_quality),
            format!("-sOutputFile={}", output.display()),
            input.display().to_string(),
        ]
    }
}

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    async fn compress(&self, input: &[u8], params: &CompressionParams) -> AppResult<Vec<u8>> {
        let start = Instant::now();

        let workdir = tempfile::Builder::new()
            .prefix("pdf-toolbox-")
            .tempdir()
            .map_err(|e| {
                AppError::processing(format!("Failed to create temporary directory: {}", e))
            })?;
        let input_path = workdir.path().join("input.pdf");
        let output_path = workdir.path().join("output.pdf");

        tokio::fs::write(&input_path, input)
            .await
            .map_err(|e| {
                AppError::processing(format!("Failed to write PDF to temporary file: {}", e))
            })?;

        debug!(
            binary = %self.binary,
            dpi = params.dpi,
            quality = params.jpeg_quality,
            preset = params.preset.as_flag_value(),
            "Invoking ghostscript"
        );

        let mut command = Command::new(&self.binary);
        command
            .args(Self::build_args(params, &input_path, &output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(AppError::processing(format!(
                    "Failed to launch {}: {}",
                    self.binary, e
                )));
            }
            Err(elapsed) => {
                warn!(
                    timeout_seconds = self.timeout.as_secs_f64(),
                    "Ghostscript timed out, process killed"
                );
                return Err(elapsed.into());
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::processing(format!(
                "Ghostscript exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let compressed = tokio::fs::read(&output_path)
            .await
            .map_err(|e| {
                AppError::processing(format!("Ghostscript produced no output file: {}", e))
            })?;

        info!(
            dpi = params.dpi,
            quality = params.jpeg_quality,
            input_size = input.len(),
            output_size = compressed.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Ghostscript run completed"
        );

        Ok(compressed)
    }

    fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
