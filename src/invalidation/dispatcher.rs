//! Invalidation Dispatcher
//!
//! A registry of named async subscribers plus the translation from catalog mutations to
//! `CacheInvalidationEvent`s. `publish` awaits every subscriber before returning, so by
//! the time a mutation handler gets control back the page cache has been revalidated
//! and the search index marked `EMPTY`.
//!
//! Each subscriber runs in its own task. An `Err` or a panic is logged and recorded in
//! the report; the remaining subscribers still run and the publisher never fails.
//!
//! The `invalidate_after_*` entry points run on a task of their own as well. A mutation
//! handler dropped mid-await (client disconnect) has already committed its write, so
//! the invalidation must still finish without it.

use super::policy::{
    ALL_PRODUCTS_PREFIX, BLOG_PATH, CategoryInvalidationPolicy, PRODUCTS_PATH, PathSet,
    SITEMAP_PATH, category_path, post_path, product_path,
};
use super::types::*;
use crate::catalog::source::CatalogSource;
use crate::error::AppError;

use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type-erased async subscriber.
pub type SubscriberFn = Arc<
    dyn Fn(Arc<CacheInvalidationEvent>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

pub struct InvalidationDispatcher {
    subscribers: DashMap<String, SubscriberFn>,
    source: Arc<dyn CatalogSource>,
    policy: CategoryInvalidationPolicy,
}

impl InvalidationDispatcher {
    pub fn new(source: Arc<dyn CatalogSource>, policy: CategoryInvalidationPolicy) -> Arc<Self> {
        Arc::new(Self {
            subscribers: DashMap::new(),
            source,
            policy,
        })
    }

    /// Registers `subscriber` under `name`, replacing any previous one with that name.
    pub fn subscribe<F, Fut>(&self, name: &str, subscriber: F)
    where
        F: Fn(Arc<CacheInvalidationEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let subscriber_fn: SubscriberFn = Arc::new(move |event| {
            Box::pin(subscriber(event)) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
        });

        self.subscribers.insert(name.to_string(), subscriber_fn);
        tracing::info!("Registered invalidation subscriber: {}", name);
    }

    pub fn has_subscriber(&self, name: &str) -> bool {
        self.subscribers.contains_key(name)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Subscriber names, sorted. Also the order `publish` runs them in.
    pub fn list_subscribers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .subscribers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub async fn publish(&self, event: CacheInvalidationEvent) -> InvalidationReport {
        let event = Arc::new(event);

        // Clone the handles out so no map guard is held across an await.
        let mut subscribers: Vec<(String, SubscriberFn)> = self
            .subscribers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        subscribers.sort_by(|a, b| a.0.cmp(&b.0));

        tracing::debug!(
            "Publishing {:?} invalidation for {} ({} paths) to {} subscribers",
            event.entity_type,
            event.entity_id,
            event.paths.len(),
            subscribers.len()
        );

        let mut report = InvalidationReport::default();
        for (name, subscriber) in subscribers {
            let outcome = tokio::spawn(subscriber(event.clone())).await;

            let failure = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => AppError::InvalidationFailure(format!("{name}: {e:#}")),
                Err(join_error) if join_error.is_panic() => {
                    AppError::InvalidationFailure(format!("{name}: subscriber panicked"))
                }
                Err(join_error) => AppError::InvalidationFailure(format!("{name}: {join_error}")),
            };

            tracing::error!("{}", failure);
            report.failed.push(name);
        }

        report
    }

    // ============================================================
    // MUTATION ENTRY POINTS
    // ============================================================

    /// Product create/update/delete: detail page (old and new slug), product listing,
    /// affected category listings, sitemap, and the search index.
    pub async fn invalidate_after_product_mutation(
        self: &Arc<Self>,
        id: &str,
        mutation: &ProductMutation,
    ) -> InvalidationReport {
        let event = product_event(id, mutation);
        self.detached(move |this| async move { this.publish(event).await })
            .await
    }

    /// Category create/update/delete: category listing (old and new slug), product
    /// listing, product pages chosen by the configured policy, sitemap, and the search
    /// index (category names are part of the searchable text).
    pub async fn invalidate_after_category_mutation(
        self: &Arc<Self>,
        slug: &str,
        mutation: &CategoryMutation,
    ) -> InvalidationReport {
        let slug = slug.to_string();
        let mutation = mutation.clone();
        self.detached(move |this| async move {
            let event = this.category_event(&slug, &mutation).await;
            this.publish(event).await
        })
        .await
    }

    /// Post create/delete: blog listing, the post page, sitemap, and the search index.
    pub async fn invalidate_after_post_mutation(
        self: &Arc<Self>,
        id: &str,
        slug: &str,
    ) -> InvalidationReport {
        let event = post_event(id, slug);
        self.detached(move |this| async move { this.publish(event).await })
            .await
    }

    async fn detached<F, Fut>(self: &Arc<Self>, work: F) -> InvalidationReport
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = InvalidationReport> + Send + 'static,
    {
        match tokio::spawn(work(self.clone())).await {
            Ok(report) => report,
            Err(join_error) => {
                let failure = AppError::InvalidationFailure(format!("dispatch: {join_error}"));
                tracing::error!("{}", failure);
                InvalidationReport {
                    delivered: 0,
                    failed: vec!["dispatch".to_string()],
                }
            }
        }
    }

    async fn category_event(
        &self,
        slug: &str,
        mutation: &CategoryMutation,
    ) -> CacheInvalidationEvent {
        let mut paths = PathSet::default();
        paths.add(category_path(slug));
        if let Some(previous) = &mutation.previous_slug {
            paths.add(category_path(previous));
        }
        paths.add(PRODUCTS_PATH);

        match self.policy {
            CategoryInvalidationPolicy::Referencing => {
                for product in &mutation.cascaded_product_slugs {
                    paths.add(product_path(product));
                }
                match self.source.product_slugs_in_category(slug).await {
                    Ok(products) => {
                        for product in products {
                            paths.add(product_path(&product));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Could not list products of category {}, revalidating all product pages: {:#}",
                            slug,
                            e
                        );
                        paths.add(ALL_PRODUCTS_PREFIX);
                    }
                }
            }
            CategoryInvalidationPolicy::All => paths.add(ALL_PRODUCTS_PREFIX),
            CategoryInvalidationPolicy::CategoryOnly => {}
        }
        paths.add(SITEMAP_PATH);

        CacheInvalidationEvent {
            entity_type: EntityType::Category,
            entity_id: slug.to_string(),
            paths: paths.into_vec(),
            refresh_search_index: true,
        }
    }
}

fn product_event(id: &str, mutation: &ProductMutation) -> CacheInvalidationEvent {
    let mut paths = PathSet::default();
    paths.add(product_path(&mutation.slug));
    if let Some(previous) = &mutation.previous_slug {
        paths.add(product_path(previous));
    }
    paths.add(PRODUCTS_PATH);
    for category in [&mutation.category_slug, &mutation.previous_category_slug]
        .into_iter()
        .flatten()
    {
        paths.add(category_path(category));
    }
    paths.add(SITEMAP_PATH);

    CacheInvalidationEvent {
        entity_type: EntityType::Product,
        entity_id: id.to_string(),
        paths: paths.into_vec(),
        refresh_search_index: true,
    }
}

fn post_event(id: &str, slug: &str) -> CacheInvalidationEvent {
    let mut paths = PathSet::default();
    paths.add(BLOG_PATH);
    paths.add(post_path(slug));
    paths.add(SITEMAP_PATH);

    CacheInvalidationEvent {
        entity_type: EntityType::Post,
        entity_id: id.to_string(),
        paths: paths.into_vec(),
        refresh_search_index: true,
    }
}
