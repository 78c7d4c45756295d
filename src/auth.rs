//! Admin gate.
//!
//! Admin routes require the configured token in `X-Admin-Token` or as a bearer token.
//! Without a configured token the gate is open, which is meant for local development.

use crate::config::Config;
use crate::error::AppError;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

pub fn require_admin(headers: &HeaderMap, config: &Config) -> Result<(), AppError> {
    let Some(expected) = config.admin_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
        })
        .map(str::trim);

    match presented {
        Some(token) if token == expected => Ok(()),
        Some(_) => {
            tracing::warn!("Rejected admin request with wrong token");
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}
