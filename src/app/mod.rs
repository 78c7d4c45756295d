//! Application Wiring
//!
//! Builds the shared services, connects the invalidation dispatcher to its
//! subscribers, and exposes the HTTP router.
//!
//! ## Subscribers
//! - **`search-index`**: marks the search index `EMPTY` for events that ask for it.
//! - **`page-cache`**: revalidates the event's paths in the storefront page cache.
//!
//! Both are registered before the router exists, so no mutation can run without them.

use crate::catalog::handlers::*;
use crate::catalog::store::CatalogStore;
use crate::catalog::types::{
    CreateCategoryRequest, CreatePostRequest, CreateProductRequest, PublishStatus,
};
use crate::clock::Clock;
use crate::config::Config;
use crate::invalidation::dispatcher::InvalidationDispatcher;
use crate::ratelimit::handlers::handle_reset_rate_limit;
use crate::ratelimit::limiter::RateLimiter;
use crate::search::cache::SearchIndexCache;
use crate::search::handlers::*;
use crate::search::snapshot::SnapshotStore;
use crate::storefront::handlers::*;
use crate::storefront::page_cache::PageCache;

use axum::routing::{delete, get, post, put};
use axum::{Extension, Router};
use std::sync::Arc;
use tokio::signal;

pub const SEARCH_INDEX_SUBSCRIBER: &str = "search-index";
pub const PAGE_CACHE_SUBSCRIBER: &str = "page-cache";

/// Every long-lived component, shared by handlers through `Extension` layers.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub store: Arc<CatalogStore>,
    pub search: Arc<SearchIndexCache>,
    pub pages: Arc<PageCache>,
    pub limiter: Arc<RateLimiter>,
    pub dispatcher: Arc<InvalidationDispatcher>,
}

impl Services {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        let store = CatalogStore::new(clock.clone());
        let search = SearchIndexCache::new(
            store.clone(),
            clock.clone(),
            SnapshotStore::new(config.snapshot_path.clone()),
        );
        let pages = PageCache::with_clock(clock.clone());
        let limiter = RateLimiter::new(clock);
        let dispatcher = InvalidationDispatcher::new(store.clone(), config.category_policy);

        register_subscribers(&dispatcher, &search, &pages);

        tracing::info!(
            "Services ready (category policy: {}, snapshot: {:?})",
            config.category_policy,
            config.snapshot_path
        );

        Self {
            config,
            store,
            search,
            pages,
            limiter,
            dispatcher,
        }
    }
}

fn register_subscribers(
    dispatcher: &InvalidationDispatcher,
    search: &Arc<SearchIndexCache>,
    pages: &Arc<PageCache>,
) {
    let search = search.clone();
    dispatcher.subscribe(SEARCH_INDEX_SUBSCRIBER, move |event| {
        let search = search.clone();
        async move {
            if event.refresh_search_index {
                search.invalidate().await;
            }
            Ok(())
        }
    });

    let pages = pages.clone();
    dispatcher.subscribe(PAGE_CACHE_SUBSCRIBER, move |event| {
        let pages = pages.clone();
        async move {
            pages.revalidate(&event.paths);
            Ok(())
        }
    });
}

pub fn router(services: &Services) -> Router {
    Router::new()
        // Search
        .route("/search", get(handle_search))
        .route("/search-index", get(handle_search_index))
        .route("/admin/rebuild-search", post(handle_rebuild_search))
        .route("/admin/search-status", get(handle_search_status))
        // Storefront
        .route("/products", get(handle_products))
        .route("/products/:slug", get(handle_product))
        .route("/categories/:slug", get(handle_category))
        .route("/blog", get(handle_blog))
        .route("/blog/:slug", get(handle_post))
        .route("/sitemap.xml", get(handle_sitemap))
        // Admin mutations
        .route("/admin/products", post(handle_create_product))
        .route(
            "/admin/products/:id",
            put(handle_update_product).delete(handle_delete_product),
        )
        .route("/admin/categories", post(handle_create_category))
        .route(
            "/admin/categories/:slug",
            put(handle_update_category).delete(handle_delete_category),
        )
        .route("/admin/posts", post(handle_create_post))
        .route("/admin/posts/:id", delete(handle_delete_post))
        .route("/admin/rate-limit/reset", post(handle_reset_rate_limit))
        .layer(Extension(services.config.clone()))
        .layer(Extension(services.store.clone()))
        .layer(Extension(services.search.clone()))
        .layer(Extension(services.pages.clone()))
        .layer(Extension(services.limiter.clone()))
        .layer(Extension(services.dispatcher.clone()))
}

/// Loads a small catalog for local development.
pub async fn seed_demo(services: &Services) -> anyhow::Result<()> {
    let store = &services.store;

    for name in ["Áo", "Giày"] {
        let change = store.create_category(CreateCategoryRequest {
            name: name.to_string(),
            slug: None,
        })?;
        tracing::debug!("Seeded category {}", change.category.slug);
    }

    let products = [
        ("Áo thun basic", "Cotton 100%, form rộng", 199_000, "ao"),
        ("Áo sơ mi trắng", "Vải lanh thoáng mát", 349_000, "ao"),
        ("Giày sneaker", "Đế cao su, đi hằng ngày", 890_000, "giay"),
    ];
    for (name, description, price, category) in products {
        store.create_product(CreateProductRequest {
            name: name.to_string(),
            slug: None,
            description: description.to_string(),
            price,
            category_slug: Some(category.to_string()),
            status: PublishStatus::Published,
            published_at: None,
        })?;
    }

    store.create_post(CreatePostRequest {
        title: "Phối đồ mùa hè với áo thun".to_string(),
        slug: None,
        excerpt: "Ba cách phối cho những ngày nắng nóng".to_string(),
        status: PublishStatus::Published,
        published_at: None,
    })?;

    // Seeding bypasses the admin handlers, so drop anything derived so far.
    services.search.invalidate().await;
    tracing::info!("Seeded demo catalog ({} products)", store.product_count());
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests;
