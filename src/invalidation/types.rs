use serde::{Deserialize, Serialize};

use crate::catalog::types::{CategoryChange, ProductChange};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Product,
    Category,
    Post,
}

/// What changed, and which cached artifacts depend on it. Consumed synchronously by
/// the dispatcher and dropped.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheInvalidationEvent {
    pub entity_type: EntityType,
    pub entity_id: String,
    /// Route paths to revalidate. A trailing `*` means "every path with this prefix".
    pub paths: Vec<String>,
    pub refresh_search_index: bool,
}

/// Context a product mutation hands to the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductMutation {
    pub slug: String,
    pub previous_slug: Option<String>,
    pub category_slug: Option<String>,
    pub previous_category_slug: Option<String>,
}

impl From<&ProductChange> for ProductMutation {
    fn from(change: &ProductChange) -> Self {
        Self {
            slug: change.product.slug.clone(),
            previous_slug: change.previous_slug.clone(),
            category_slug: change.product.category_slug.clone(),
            previous_category_slug: change.previous_category_slug.clone(),
        }
    }
}

/// Context a category mutation hands to the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMutation {
    pub previous_slug: Option<String>,
    /// Products the store already knows were touched (rename or delete cascade).
    pub cascaded_product_slugs: Vec<String>,
}

impl From<&CategoryChange> for CategoryMutation {
    fn from(change: &CategoryChange) -> Self {
        Self {
            previous_slug: change.previous_slug.clone(),
            cascaded_product_slugs: change.cascaded_products.clone(),
        }
    }
}

/// Outcome of one publish. Informational only; mutation handlers never fail on it.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InvalidationReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
