use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::handlers::AppState;

/// Caps how many PDF operations run at once and counts rejections.
#[derive(Debug)]
pub struct RequestLimiter {
    semaphore: Arc<Semaphore>,
    max_requests: usize,
    total_requests: AtomicU64,
    rejected_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitMetrics {
    pub total_requests: u64,
    pub rejected_requests: u64,
    pub available_permits: usize,
    pub max_requests: usize,
}

impl RequestLimiter {
    pub fn new(max_requests: usize) -> Self {
        info!(
            max_concurrent_requests = max_requests,
            "Initializing request semaphore"
        );
        Self {
            semaphore: Arc::new(Semaphore::new(max_requests)),
            max_requests,
            total_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> RateLimitMetrics {
        RateLimitMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            available_permits: self.semaphore.available_permits(),
            max_requests: self.max_requests,
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let limiter = &state.limiter;

    let total_requests = limiter.total_requests.fetch_add(1, Ordering::Relaxed) + 1;

    // Held until the response is produced
    let _permit = limiter
        .semaphore
        .clone()
        .try_acquire_owned()
        .map_err(|_| {
            let rejected = limiter.rejected_requests.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                path = path,
                total_requests = total_requests,
                rejected_requests = rejected,
                available_permits = limiter.semaphore.available_permits(),
                "Rate limit exceeded - too many concurrent requests"
            );
            AppError::RateLimitExceeded
        })?;

    debug!(
        path = path,
        total_requests = total_requests,
        available_permits = limiter.semaphore.available_permits(),
        "Request permit acquired"
    );

    let response = next.run(request).await;

    debug!(
        path = path,
        available_permits = limiter.semaphore.available_permits() + 1,
        "Request completed, permit released"
    );

    Ok(response)
}
