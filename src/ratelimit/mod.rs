//! Rate Limiter Module
//!
//! Fixed-window request counting per key, kept in process memory. Keys are built as
//! `<route>:<client>` so limits can be reset per route with a prefix.
//!
//! State is per process: two instances behind a load balancer each allow the full
//! limit. Deployments that need a shared budget must put the counters in an external
//! store.
//!
//! ## Submodules
//! - **`limiter`**: `RateLimiter` with `check`, `reset` and `purge_expired`.
//! - **`handlers`**: admin reset endpoint.
//! - **`types`**: buckets, results and API payloads.

pub mod handlers;
pub mod limiter;
pub mod types;

use crate::config::RateSettings;
use crate::error::AppError;
use axum::http::HeaderMap;
use limiter::RateLimiter;
use types::RateLimitResult;

/// Identity used in rate limit keys: first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or("anonymous")
        .to_string()
}

/// Checks `key` and converts a denial into `AppError::RateLimited`.
pub fn enforce(
    limiter: &RateLimiter,
    key: &str,
    settings: RateSettings,
) -> Result<RateLimitResult, AppError> {
    let result = limiter.check(key, settings.limit, settings.window_ms);
    if result.allowed {
        return Ok(result);
    }

    tracing::warn!("Rejected request for '{}' (rate limited)", key);
    Err(AppError::RateLimited {
        retry_after_secs: result.retry_after_secs.unwrap_or(1),
    })
}
