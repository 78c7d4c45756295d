//! Admin mutation endpoints.
//!
//! Every handler writes through the store and, on success, runs the matching
//! invalidation before it responds. Invalidation outcomes never change the response.

use super::store::CatalogStore;
use super::types::*;
use crate::auth::require_admin;
use crate::config::Config;
use crate::error::AppError;
use crate::invalidation::dispatcher::InvalidationDispatcher;
use crate::invalidation::types::{CategoryMutation, ProductMutation};

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;

type Created<T> = (StatusCode, Json<MutationResponse<T>>);

fn ok<T>(data: T) -> Json<MutationResponse<T>> {
    Json(MutationResponse {
        success: true,
        data,
    })
}

// ============================================================
// PRODUCTS
// ============================================================

pub async fn handle_create_product(
    headers: HeaderMap,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Created<Product>, AppError> {
    require_admin(&headers, &config)?;

    let change = store.create_product(req)?;
    dispatcher
        .invalidate_after_product_mutation(&change.product.id, &ProductMutation::from(&change))
        .await;

    Ok((StatusCode::CREATED, ok(change.product)))
}

pub async fn handle_update_product(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<MutationResponse<Product>>, AppError> {
    require_admin(&headers, &config)?;

    let change = store.update_product(&id, req)?;
    dispatcher
        .invalidate_after_product_mutation(&id, &ProductMutation::from(&change))
        .await;

    Ok(ok(change.product))
}

pub async fn handle_delete_product(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
) -> Result<Json<MutationResponse<Product>>, AppError> {
    require_admin(&headers, &config)?;

    let change = store.delete_product(&id)?;
    dispatcher
        .invalidate_after_product_mutation(&id, &ProductMutation::from(&change))
        .await;

    Ok(ok(change.product))
}

// ============================================================
// CATEGORIES
// ============================================================

pub async fn handle_create_category(
    headers: HeaderMap,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Created<Category>, AppError> {
    require_admin(&headers, &config)?;

    let change = store.create_category(req)?;
    dispatcher
        .invalidate_after_category_mutation(&change.category.slug, &CategoryMutation::from(&change))
        .await;

    Ok((StatusCode::CREATED, ok(change.category)))
}

pub async fn handle_update_category(
    headers: HeaderMap,
    Path(slug): Path<String>,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<MutationResponse<Category>>, AppError> {
    require_admin(&headers, &config)?;

    let change = store.update_category(&slug, req)?;
    dispatcher
        .invalidate_after_category_mutation(&change.category.slug, &CategoryMutation::from(&change))
        .await;

    Ok(ok(change.category))
}

pub async fn handle_delete_category(
    headers: HeaderMap,
    Path(slug): Path<String>,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
) -> Result<Json<MutationResponse<Category>>, AppError> {
    require_admin(&headers, &config)?;

    let change = store.delete_category(&slug)?;
    dispatcher
        .invalidate_after_category_mutation(&slug, &CategoryMutation::from(&change))
        .await;

    Ok(ok(change.category))
}

// ============================================================
// POSTS
// ============================================================

pub async fn handle_create_post(
    headers: HeaderMap,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Created<Post>, AppError> {
    require_admin(&headers, &config)?;

    let post = store.create_post(req)?;
    dispatcher
        .invalidate_after_post_mutation(&post.id, &post.slug)
        .await;

    Ok((StatusCode::CREATED, ok(post)))
}

pub async fn handle_delete_post(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(config): Extension<Arc<Config>>,
    Extension(store): Extension<Arc<CatalogStore>>,
    Extension(dispatcher): Extension<Arc<InvalidationDispatcher>>,
) -> Result<Json<MutationResponse<Post>>, AppError> {
    require_admin(&headers, &config)?;

    let post = store.delete_post(&id)?;
    dispatcher
        .invalidate_after_post_mutation(&post.id, &post.slug)
        .await;

    Ok(ok(post))
}
