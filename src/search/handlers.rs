use super::cache::SearchIndexCache;
use super::engine::{clamp_limit, prepare_query, search};
use super::types::{CacheStatus, IndexEntry, RebuildResponse, SearchParams, SearchResponse};
use crate::auth::require_admin;
use crate::config::Config;
use crate::error::AppError;
use crate::ratelimit::limiter::RateLimiter;
use crate::ratelimit::{client_key, enforce};

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use std::sync::Arc;

/// `GET /search?q=&limit=`
///
/// Short queries return an empty result without touching the index. If the index
/// cannot be built and there is nothing to fall back on, the result is empty too.
pub async fn handle_search(
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
    Extension(config): Extension<Arc<Config>>,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(cache): Extension<Arc<SearchIndexCache>>,
) -> Result<Json<SearchResponse>, AppError> {
    let client = client_key(&headers);
    enforce(&limiter, &format!("search:{client}"), config.search_rate)?;

    let raw = params.q.unwrap_or_default();
    let Some(query) = prepare_query(&raw, config.search.min_query_chars) else {
        tracing::debug!("Query '{}' below minimum length, skipping index", raw.trim());
        return Ok(Json(SearchResponse::empty(raw.trim())));
    };

    let limit = clamp_limit(
        params.limit.as_deref(),
        config.search.default_limit,
        config.search.max_limit,
    );

    let index = match cache.get().await {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!("Search for '{}' degraded to empty result: {}", query.text, e);
            return Ok(Json(SearchResponse::empty(query.text)));
        }
    };

    let outcome = search(&index, &query, limit);
    tracing::debug!(
        "Search '{}' matched {} entries, returning {}",
        query.text,
        outcome.total,
        outcome.hits.len()
    );

    Ok(Json(SearchResponse {
        query: query.text,
        total: outcome.total,
        items: outcome.hits.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /search-index`
pub async fn handle_search_index(
    Extension(cache): Extension<Arc<SearchIndexCache>>,
) -> Result<Json<Vec<IndexEntry>>, AppError> {
    let entries = cache.export().await?;
    Ok(Json(entries))
}

/// `POST /admin/rebuild-search`
pub async fn handle_rebuild_search(
    headers: HeaderMap,
    Extension(config): Extension<Arc<Config>>,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(cache): Extension<Arc<SearchIndexCache>>,
) -> Result<Json<RebuildResponse>, AppError> {
    require_admin(&headers, &config)?;
    let client = client_key(&headers);
    enforce(&limiter, &format!("rebuild:{client}"), config.rebuild_rate)?;

    let index = cache.rebuild().await?;
    tracing::info!("Admin rebuild finished with {} entries", index.len());

    Ok(Json(RebuildResponse {
        status: "ok".to_string(),
        entries: index.len(),
        built_at: index.built_at,
    }))
}

/// `GET /admin/search-status`
pub async fn handle_search_status(
    headers: HeaderMap,
    Extension(config): Extension<Arc<Config>>,
    Extension(cache): Extension<Arc<SearchIndexCache>>,
) -> Result<Json<CacheStatus>, AppError> {
    require_admin(&headers, &config)?;
    Ok(Json(cache.status().await))
}
