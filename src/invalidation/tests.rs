//! Invalidation Module Tests
//!
//! ## Test Scopes
//! - **Paths**: the set of routes each mutation revalidates, per category policy.
//! - **Isolation**: failing and panicking subscribers do not stop the others.
//! - **Registry**: subscribe/replace/list semantics.

#[cfg(test)]
mod tests {
    use crate::catalog::source::CatalogSource;
    use crate::catalog::store::CatalogStore;
    use crate::catalog::types::*;
    use crate::clock::ManualClock;
    use crate::invalidation::dispatcher::InvalidationDispatcher;
    use crate::invalidation::policy::CategoryInvalidationPolicy;
    use crate::invalidation::types::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct UnreachableSource;

    #[async_trait]
    impl CatalogSource for UnreachableSource {
        async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
            anyhow::bail!("database offline")
        }

        async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
            anyhow::bail!("database offline")
        }

        async fn list_posts(&self) -> anyhow::Result<Vec<Post>> {
            anyhow::bail!("database offline")
        }

        async fn product_slugs_in_category(&self, _: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("database offline")
        }
    }

    fn store_with_category() -> Arc<CatalogStore> {
        let store = CatalogStore::new(ManualClock::new(1_000));
        store
            .create_category(CreateCategoryRequest {
                name: "Giày".to_string(),
                slug: None,
            })
            .unwrap();
        for name in ["Sneaker trắng", "Sandal"] {
            store
                .create_product(CreateProductRequest {
                    name: name.to_string(),
                    slug: None,
                    description: String::new(),
                    price: 100,
                    category_slug: Some("giay".to_string()),
                    status: PublishStatus::Published,
                    published_at: None,
                })
                .unwrap();
        }
        store
    }

    /// Dispatcher with one subscriber that records every event it sees.
    fn recording(
        source: Arc<dyn CatalogSource>,
        policy: CategoryInvalidationPolicy,
    ) -> (
        Arc<InvalidationDispatcher>,
        Arc<Mutex<Vec<CacheInvalidationEvent>>>,
    ) {
        let dispatcher = InvalidationDispatcher::new(source, policy);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        dispatcher.subscribe("recorder", move |event| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push((*event).clone());
                Ok(())
            }
        });
        (dispatcher, seen)
    }

    // ============================================================
    // PRODUCT MUTATIONS
    // ============================================================

    #[tokio::test]
    async fn test_product_mutation_paths() {
        // ARRANGE
        let (dispatcher, seen) = recording(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::default(),
        );
        let mutation = ProductMutation {
            slug: "ao-thun-basic".to_string(),
            previous_slug: None,
            category_slug: Some("ao".to_string()),
            previous_category_slug: None,
        };

        // ACT
        let report = dispatcher
            .invalidate_after_product_mutation("p1", &mutation)
            .await;

        // ASSERT
        assert!(report.is_clean());
        assert_eq!(report.delivered, 1);

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity_type, EntityType::Product);
        assert_eq!(events[0].entity_id, "p1");
        assert!(events[0].refresh_search_index);
        assert_eq!(
            events[0].paths,
            vec![
                "/products/ao-thun-basic",
                "/products",
                "/categories/ao",
                "/sitemap.xml"
            ]
        );
    }

    #[tokio::test]
    async fn test_product_rename_revalidates_old_and_new_pages() {
        let (dispatcher, seen) = recording(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::default(),
        );
        let mutation = ProductMutation {
            slug: "ao-polo".to_string(),
            previous_slug: Some("ao-thun".to_string()),
            category_slug: Some("ao".to_string()),
            previous_category_slug: Some("sale".to_string()),
        };

        dispatcher
            .invalidate_after_product_mutation("p1", &mutation)
            .await;

        let events = seen.lock().unwrap();
        let paths = &events[0].paths;
        assert!(paths.contains(&"/products/ao-polo".to_string()));
        assert!(paths.contains(&"/products/ao-thun".to_string()));
        assert!(paths.contains(&"/categories/ao".to_string()));
        assert!(paths.contains(&"/categories/sale".to_string()));
    }

    // ============================================================
    // CATEGORY MUTATIONS
    // ============================================================

    #[tokio::test]
    async fn test_category_referencing_policy_lists_products() {
        let store = store_with_category();
        let (dispatcher, seen) = recording(store, CategoryInvalidationPolicy::Referencing);

        dispatcher
            .invalidate_after_category_mutation("giay", &CategoryMutation::default())
            .await;

        let events = seen.lock().unwrap();
        assert_eq!(events[0].entity_type, EntityType::Category);
        assert_eq!(
            events[0].paths,
            vec![
                "/categories/giay",
                "/products",
                "/products/sneaker-trang",
                "/products/sandal",
                "/sitemap.xml"
            ]
        );
    }

    #[tokio::test]
    async fn test_category_rename_includes_previous_listing() {
        // ARRANGE
        let store = store_with_category();
        let change = store
            .update_category(
                "giay",
                UpdateCategoryRequest {
                    name: None,
                    slug: Some("giay-dep".to_string()),
                },
            )
            .unwrap();
        let (dispatcher, seen) = recording(store, CategoryInvalidationPolicy::Referencing);

        // ACT
        dispatcher
            .invalidate_after_category_mutation(
                &change.category.slug,
                &CategoryMutation::from(&change),
            )
            .await;

        // ASSERT
        let events = seen.lock().unwrap();
        let paths = &events[0].paths;
        assert_eq!(paths[0], "/categories/giay-dep");
        assert_eq!(paths[1], "/categories/giay");
        assert!(paths.contains(&"/products/sandal".to_string()));
        // Cascaded and looked-up slugs are the same products, listed once.
        assert_eq!(
            paths.iter().filter(|p| *p == "/products/sandal").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_category_delete_uses_cascaded_slugs() {
        let store = store_with_category();
        let change = store.delete_category("giay").unwrap();
        let (dispatcher, seen) = recording(store, CategoryInvalidationPolicy::Referencing);

        dispatcher
            .invalidate_after_category_mutation("giay", &CategoryMutation::from(&change))
            .await;

        // The products are soft-deleted now, so only the cascade knows about them.
        let events = seen.lock().unwrap();
        assert!(events[0].paths.contains(&"/products/sneaker-trang".to_string()));
        assert!(events[0].paths.contains(&"/products/sandal".to_string()));
    }

    #[tokio::test]
    async fn test_category_lookup_failure_over_invalidates() {
        let (dispatcher, seen) = recording(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::Referencing,
        );

        let report = dispatcher
            .invalidate_after_category_mutation("giay", &CategoryMutation::default())
            .await;

        assert!(report.is_clean());
        let events = seen.lock().unwrap();
        assert!(events[0].paths.contains(&"/products/*".to_string()));
    }

    #[tokio::test]
    async fn test_category_policies() {
        for (policy, expect_prefix, expect_product) in [
            (CategoryInvalidationPolicy::All, true, false),
            (CategoryInvalidationPolicy::CategoryOnly, false, false),
        ] {
            let (dispatcher, seen) = recording(store_with_category(), policy);

            dispatcher
                .invalidate_after_category_mutation("giay", &CategoryMutation::default())
                .await;

            let events = seen.lock().unwrap();
            let paths = &events[0].paths;
            assert_eq!(paths.contains(&"/products/*".to_string()), expect_prefix);
            assert_eq!(
                paths.contains(&"/products/sandal".to_string()),
                expect_product
            );
            assert!(paths.contains(&"/categories/giay".to_string()));
            assert!(paths.contains(&"/sitemap.xml".to_string()));
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "referencing".parse::<CategoryInvalidationPolicy>(),
            Ok(CategoryInvalidationPolicy::Referencing)
        );
        assert_eq!(
            " ALL ".parse::<CategoryInvalidationPolicy>(),
            Ok(CategoryInvalidationPolicy::All)
        );
        assert_eq!(
            "category-only".parse::<CategoryInvalidationPolicy>(),
            Ok(CategoryInvalidationPolicy::CategoryOnly)
        );
        assert!("sometimes".parse::<CategoryInvalidationPolicy>().is_err());
        assert_eq!(
            CategoryInvalidationPolicy::CategoryOnly.to_string(),
            "category-only"
        );
    }

    // ============================================================
    // POSTS
    // ============================================================

    #[tokio::test]
    async fn test_post_mutation_paths() {
        let (dispatcher, seen) = recording(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::default(),
        );

        dispatcher
            .invalidate_after_post_mutation("b1", "mua-he")
            .await;

        let events = seen.lock().unwrap();
        assert_eq!(events[0].entity_type, EntityType::Post);
        assert_eq!(
            events[0].paths,
            vec!["/blog", "/blog/mua-he", "/sitemap.xml"]
        );
    }

    // ============================================================
    // SUBSCRIBER ISOLATION
    // ============================================================

    #[tokio::test]
    async fn test_failing_and_panicking_subscribers_do_not_stop_others() {
        // ARRANGE
        let dispatcher = InvalidationDispatcher::new(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));

        dispatcher.subscribe("a-failing", |_event| async {
            Err(anyhow::anyhow!("cache backend unreachable"))
        });
        dispatcher.subscribe("b-panicking", |event| async move {
            if event.refresh_search_index {
                panic!("subscriber bug");
            }
            Ok(())
        });
        let counter = calls.clone();
        dispatcher.subscribe("c-healthy", move |_event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        // ACT
        let report = dispatcher
            .invalidate_after_post_mutation("b1", "mua-he")
            .await;

        // ASSERT
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["a-failing", "b-panicking"]);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let dispatcher = InvalidationDispatcher::new(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::default(),
        );

        let report = dispatcher
            .invalidate_after_post_mutation("b1", "mua-he")
            .await;

        assert_eq!(report, InvalidationReport::default());
    }

    // ============================================================
    // REGISTRY
    // ============================================================

    #[test]
    fn test_subscribe_replaces_same_name() {
        let dispatcher = InvalidationDispatcher::new(
            Arc::new(UnreachableSource),
            CategoryInvalidationPolicy::default(),
        );

        dispatcher.subscribe("search-index", |_event| async { Ok(()) });
        dispatcher.subscribe("pages", |_event| async { Ok(()) });
        dispatcher.subscribe("search-index", |_event| async { Ok(()) });

        assert_eq!(dispatcher.subscriber_count(), 2);
        assert!(dispatcher.has_subscriber("pages"));
        assert!(!dispatcher.has_subscriber("sitemap"));
        assert_eq!(dispatcher.list_subscribers(), vec!["pages", "search-index"]);
    }
}
