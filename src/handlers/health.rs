use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::time::SystemTime;
use tracing::info;

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::services::PdfProcessor;

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    info!("Health check requested");

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let pdf_service = PdfProcessor::default().is_available();
    let compression = state.compression.clone();
    let ghostscript = tokio::task::spawn_blocking(move || compression.is_available()).await?;

    let metrics = state.limiter.metrics();

    // Without ghostscript, compression still answers but returns the input unchanged
    let status = match (pdf_service, ghostscript) {
        (true, true) => "healthy",
        (true, false) => "degraded",
        _ => "unhealthy",
    };

    let response = json!({
        "status": status,
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "pdf_processor": pdf_service,
            "ghostscript": ghostscript
        },
        "rate_limiting": {
            "total_requests": metrics.total_requests,
            "rejected_requests": metrics.rejected_requests,
            "available_permits": metrics.available_permits,
            "max_concurrent_requests": metrics.max_requests,
            "rejection_rate": if metrics.total_requests > 0 {
                let rate = metrics.rejected_requests as f64 / metrics.total_requests as f64;
                (rate * 100.0).round() / 100.0
            } else {
                0.0
            }
        }
    });

    info!(
        status = status,
        pdf_available = pdf_service,
        ghostscript_available = ghostscript,
        "Health check completed"
    );

    Ok(Json(response))
}

/// Readiness check endpoint
pub async fn ready_handler() -> Result<StatusCode, StatusCode> {
    let pdf_service = PdfProcessor::default().is_available();

    if pdf_service {
        info!("Readiness check passed");
        Ok(StatusCode::OK)
    } else {
        info!("Readiness check failed - PDF service unavailable");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
