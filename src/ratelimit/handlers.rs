use super::limiter::RateLimiter;
use super::types::{ResetParams, ResetResponse};
use crate::auth::require_admin;
use crate::config::Config;
use crate::error::AppError;

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use std::sync::Arc;

pub async fn handle_reset_rate_limit(
    headers: HeaderMap,
    Query(params): Query<ResetParams>,
    Extension(config): Extension<Arc<Config>>,
    Extension(limiter): Extension<Arc<RateLimiter>>,
) -> Result<Json<ResetResponse>, AppError> {
    require_admin(&headers, &config)?;

    let prefix = params.prefix.as_deref().filter(|prefix| !prefix.is_empty());
    let cleared = limiter.reset(prefix);

    Ok(Json(ResetResponse { cleared }))
}
