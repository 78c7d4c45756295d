//! Storefront Module
//!
//! Read-side pages served from the catalog: product listing and detail, category
//! listings, blog, and the sitemap. Each page is rendered once and kept in the
//! `PageCache` under its route path until an invalidation event revalidates it.
//!
//! Pages for missing or hidden records answer 404 and are never cached, so a product
//! that becomes visible later is picked up on the next request.

pub mod handlers;
pub mod page_cache;
pub mod types;
