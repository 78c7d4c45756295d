//! Storefront Search Service Library
//!
//! Search, cache invalidation and rate limiting for an e-commerce storefront. The
//! binary (`main.rs`) loads configuration, builds `app::Services` and serves the
//! router.
//!
//! ## Architecture Modules
//! - **`catalog`**: products, categories and posts with slug and soft-delete rules;
//!   the data source every derived artifact is built from.
//! - **`search`**: index builder, query engine with highlight spans, and the
//!   single-flight index cache.
//! - **`invalidation`**: turns admin mutations into invalidation events and delivers
//!   them to subscribers before the mutation responds.
//! - **`storefront`**: cached read-side pages (listings, details, sitemap).
//! - **`ratelimit`**: fixed-window counters guarding search and rebuild.
//! - **`app`**: service construction, subscriber wiring, HTTP routes.
//!
//! Supporting modules: `config` (environment), `error` (HTTP error mapping),
//! `auth` (admin token gate), `clock` (injectable time).

pub mod app;
pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod ratelimit;
pub mod search;
pub mod storefront;
