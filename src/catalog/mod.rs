//! Catalog Module
//!
//! Products, categories and blog posts: the data every derived artifact (search
//! index, storefront pages, sitemap) is computed from.
//!
//! ## Rules
//! - **Visibility**: a record is public when it is published, not soft-deleted, and
//!   its `published_at` (if any) is not in the future.
//! - **Soft delete**: deletes stamp `deleted_at`; records are never removed.
//!   Deleting a category soft-deletes its live products.
//! - **Slugs**: derived from names by diacritic folding, unique among non-deleted
//!   records of the same kind (`-2`, `-3`, ... on collision). An explicitly requested
//!   slug that is taken is a conflict.
//!
//! ## Submodules
//! - **`source`**: `CatalogSource`, the read seam used by the index builder.
//! - **`store`**: `CatalogStore`, the in-memory implementation and its mutations.
//! - **`slug`**: slug derivation.
//! - **`handlers`**: admin mutation endpoints.
//! - **`types`**: records and request payloads.

pub mod handlers;
pub mod slug;
pub mod source;
pub mod store;
pub mod types;
