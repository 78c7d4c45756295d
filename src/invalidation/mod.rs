//! Invalidation Module
//!
//! Keeps derived artifacts (cached storefront pages, the search index) consistent with
//! the catalog after admin writes.
//!
//! ## Flow
//! 1. A mutation handler writes to the catalog store.
//! 2. On success it calls one of the dispatcher's `invalidate_after_*` entry points.
//! 3. The dispatcher computes the affected paths and publishes one
//!    `CacheInvalidationEvent` to every registered subscriber, awaiting them all.
//! 4. The handler returns its success response.
//!
//! Subscriber failures are logged as `InvalidationFailure` and never reach the
//! mutation's caller: a successful write is always reported as successful.
//!
//! ## Submodules
//! - **`dispatcher`**: subscriber registry and mutation entry points.
//! - **`policy`**: path builders and `CategoryInvalidationPolicy`.
//! - **`types`**: events, mutation contexts and the publish report.

pub mod dispatcher;
pub mod policy;
pub mod types;

#[cfg(test)]
mod tests;
