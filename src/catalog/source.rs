//! Data source seam between the catalog and everything derived from it.
//!
//! The index builder and the invalidation policy only read through this trait, which
//! lets tests substitute sources that fail or count their calls.

use async_trait::async_trait;

use super::types::{Category, Post, Product};

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All products including drafts and soft-deleted ones, in insertion order.
    async fn list_products(&self) -> anyhow::Result<Vec<Product>>;

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>>;

    async fn list_posts(&self) -> anyhow::Result<Vec<Post>>;

    /// Slugs of non-deleted products whose category is `category_slug`.
    async fn product_slugs_in_category(&self, category_slug: &str) -> anyhow::Result<Vec<String>>;
}
