//! Catalog Data Types
//!
//! Records held by the catalog store and the request payloads of the admin API.
//! Timestamps are epoch milliseconds; a `deleted_at` value marks a soft delete.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

/// Shared visibility rule: published, not soft-deleted, and not scheduled for later.
pub fn is_visible(
    status: PublishStatus,
    published_at: Option<u64>,
    deleted_at: Option<u64>,
    now: u64,
) -> bool {
    status == PublishStatus::Published
        && deleted_at.is_none()
        && published_at.is_none_or(|at| at <= now)
}

/// The publish time of a record that is live in every other respect but scheduled
/// after `now`.
pub fn scheduled_after(
    status: PublishStatus,
    published_at: Option<u64>,
    deleted_at: Option<u64>,
    now: u64,
) -> Option<u64> {
    published_at
        .filter(|&at| status == PublishStatus::Published && deleted_at.is_none() && at > now)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Price in minor currency units.
    pub price: u64,
    pub category_slug: Option<String>,
    pub status: PublishStatus,
    pub published_at: Option<u64>,
    pub deleted_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
    /// Insertion sequence; listings are ordered by it.
    pub seq: u64,
}

impl Product {
    pub fn is_visible(&self, now: u64) -> bool {
        is_visible(self.status, self.published_at, self.deleted_at, now)
    }

    pub fn scheduled_after(&self, now: u64) -> Option<u64> {
        scheduled_after(self.status, self.published_at, self.deleted_at, now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub deleted_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub status: PublishStatus,
    pub published_at: Option<u64>,
    pub deleted_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
    pub seq: u64,
}

impl Post {
    pub fn is_visible(&self, now: u64) -> bool {
        is_visible(self.status, self.published_at, self.deleted_at, now)
    }

    pub fn scheduled_after(&self, now: u64) -> Option<u64> {
        scheduled_after(self.status, self.published_at, self.deleted_at, now)
    }
}

// --- Admin payloads ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: u64,
    pub category_slug: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
    pub published_at: Option<u64>,
}

/// Partial update; absent fields keep their value. `category_slug: Some("")` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<u64>,
    pub category_slug: Option<String>,
    pub status: Option<PublishStatus>,
    pub published_at: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub status: PublishStatus,
    pub published_at: Option<u64>,
}

/// Outcome of a product write, carrying what the invalidation step needs to know
/// about the previous state.
#[derive(Debug, Clone)]
pub struct ProductChange {
    pub product: Product,
    pub previous_slug: Option<String>,
    pub previous_category_slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CategoryChange {
    pub category: Category,
    pub previous_slug: Option<String>,
    /// Slugs of products touched by a cascade (slug rename or soft delete).
    pub cascaded_products: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub data: T,
}
