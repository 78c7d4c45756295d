//! Path policy.
//!
//! Builds the set of route paths a mutation affects. Paths are deduplicated and kept
//! in the order they were added.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PRODUCTS_PATH: &str = "/products";
pub const SITEMAP_PATH: &str = "/sitemap.xml";
pub const BLOG_PATH: &str = "/blog";
/// Every product detail page.
pub const ALL_PRODUCTS_PREFIX: &str = "/products/*";

pub fn product_path(slug: &str) -> String {
    format!("{PRODUCTS_PATH}/{slug}")
}

pub fn category_path(slug: &str) -> String {
    format!("/categories/{slug}")
}

pub fn post_path(slug: &str) -> String {
    format!("{BLOG_PATH}/{slug}")
}

/// Which product detail pages a category mutation revalidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryInvalidationPolicy {
    /// Products currently filed under the category, plus any the mutation cascaded to.
    #[default]
    Referencing,
    /// Every product page (`/products/*`).
    All,
    /// Only the category listing, the product listing and the sitemap.
    CategoryOnly,
}

impl fmt::Display for CategoryInvalidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Referencing => "referencing",
            Self::All => "all",
            Self::CategoryOnly => "category-only",
        };
        f.write_str(name)
    }
}

impl FromStr for CategoryInvalidationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "referencing" => Ok(Self::Referencing),
            "all" => Ok(Self::All),
            "category-only" | "category_only" => Ok(Self::CategoryOnly),
            other => Err(format!(
                "unknown policy '{other}' (expected referencing, all or category-only)"
            )),
        }
    }
}

/// Ordered, duplicate-free path list.
#[derive(Debug, Default)]
pub struct PathSet {
    paths: Vec<String>,
}

impl PathSet {
    pub fn add(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.paths
    }
}
