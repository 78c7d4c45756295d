//! Application Tests
//!
//! End-to-end flows through the real handlers with every service wired the way the
//! server wires them: admin mutation -> dispatcher -> subscribers -> fresh reads.

#[cfg(test)]
mod tests {
    use crate::app::{PAGE_CACHE_SUBSCRIBER, SEARCH_INDEX_SUBSCRIBER, Services, router, seed_demo};
    use crate::catalog::handlers::*;
    use crate::catalog::types::*;
    use crate::clock::ManualClock;
    use crate::config::{Config, RateSettings};
    use crate::error::AppError;
    use crate::search::handlers::{handle_rebuild_search, handle_search, handle_search_index};
    use crate::search::types::{CacheState, HighlightSpan, SearchParams, SearchResponse};
    use crate::storefront::handlers::{handle_category, handle_products};
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use axum::{Extension, Json};
    use std::task::Poll;

    fn services() -> Services {
        services_with(Config::default())
    }

    fn services_with(config: Config) -> Services {
        Services::new(config, ManualClock::new(1_000_000))
    }

    async fn create_product(
        services: &Services,
        headers: HeaderMap,
        req: CreateProductRequest,
    ) -> Result<Product, AppError> {
        handle_create_product(
            headers,
            Extension(services.config.clone()),
            Extension(services.store.clone()),
            Extension(services.dispatcher.clone()),
            Json(req),
        )
        .await
        .map(|(_, json)| json.0.data)
    }

    async fn search(services: &Services, q: &str) -> SearchResponse {
        handle_search(
            HeaderMap::new(),
            Query(SearchParams {
                q: Some(q.to_string()),
                limit: None,
            }),
            Extension(services.config.clone()),
            Extension(services.limiter.clone()),
            Extension(services.search.clone()),
        )
        .await
        .unwrap()
        .0
    }

    async fn rebuild(services: &Services) -> Result<usize, AppError> {
        handle_rebuild_search(
            HeaderMap::new(),
            Extension(services.config.clone()),
            Extension(services.limiter.clone()),
            Extension(services.search.clone()),
        )
        .await
        .map(|json| json.0.entries)
    }

    async fn category_status(services: &Services, slug: &str) -> StatusCode {
        match handle_category(
            Path(slug.to_string()),
            Extension(services.store.clone()),
            Extension(services.pages.clone()),
        )
        .await
        {
            Ok(response) => response.status(),
            Err(e) => e.into_response().status(),
        }
    }

    fn ao_thun() -> CreateProductRequest {
        CreateProductRequest {
            name: "Áo thun basic".to_string(),
            description: "Cotton 100%".to_string(),
            price: 199_000,
            status: PublishStatus::Published,
            ..Default::default()
        }
    }

    // ============================================================
    // WIRING
    // ============================================================

    #[test]
    fn test_services_register_both_subscribers() {
        let services = services();

        assert_eq!(
            services.dispatcher.list_subscribers(),
            vec![PAGE_CACHE_SUBSCRIBER, SEARCH_INDEX_SUBSCRIBER]
        );
        // Route table must build without conflicting paths.
        let _router = router(&services);
    }

    // ============================================================
    // END-TO-END: SEARCH AFTER MUTATION
    // ============================================================

    #[tokio::test]
    async fn test_created_product_is_searchable_then_deleted_product_is_not() {
        // ARRANGE
        let services = services();
        let product = create_product(&services, HeaderMap::new(), ao_thun())
            .await
            .unwrap();
        assert_eq!(product.slug, "ao-thun-basic");

        // ACT
        assert_eq!(rebuild(&services).await.unwrap(), 1);
        let found = search(&services, "áo thun").await;

        // ASSERT
        let hit = found
            .items
            .iter()
            .find(|item| item.slug == "ao-thun-basic")
            .expect("created product is searchable");
        assert_eq!(hit.highlights.name, vec![HighlightSpan(0, 6)]);

        handle_delete_product(
            HeaderMap::new(),
            Path(product.id.clone()),
            Extension(services.config.clone()),
            Extension(services.store.clone()),
            Extension(services.dispatcher.clone()),
        )
        .await
        .unwrap();
        assert_eq!(rebuild(&services).await.unwrap(), 0);

        let gone = search(&services, "áo thun").await;
        assert!(gone.items.iter().all(|item| item.slug != "ao-thun-basic"));
        assert_eq!(gone.total, 0);
    }

    #[tokio::test]
    async fn test_mutation_invalidates_before_responding() {
        // ARRANGE
        let services = services();
        services.search.get().await.unwrap();
        handle_products(
            Extension(services.store.clone()),
            Extension(services.pages.clone()),
        )
        .await
        .unwrap();
        assert!(services.pages.contains("/products"));

        // ACT
        create_product(&services, HeaderMap::new(), ao_thun())
            .await
            .unwrap();

        // ASSERT
        assert_eq!(services.search.status().await.state, CacheState::Empty);
        assert!(!services.pages.contains("/products"));

        // The very next query sees the new product without an explicit rebuild.
        let found = search(&services, "ao thun").await;
        assert_eq!(found.total, 1);
    }

    #[tokio::test]
    async fn test_failing_subscriber_does_not_fail_mutation() {
        let services = services();
        services.search.get().await.unwrap();
        services.dispatcher.subscribe("flaky-cdn", |_event| async {
            Err(anyhow::anyhow!("purge endpoint timed out"))
        });

        let created = create_product(&services, HeaderMap::new(), ao_thun()).await;

        assert!(created.is_ok());
        assert_eq!(services.search.status().await.state, CacheState::Empty);
    }

    #[tokio::test]
    async fn test_abandoned_mutation_request_still_invalidates() {
        // ARRANGE
        let services = services();
        services.search.get().await.unwrap();
        let request = handle_create_product(
            HeaderMap::new(),
            Extension(services.config.clone()),
            Extension(services.store.clone()),
            Extension(services.dispatcher.clone()),
            Json(ao_thun()),
        );

        // ACT: one poll commits the write, then the client goes away.
        {
            let mut request = std::pin::pin!(request);
            std::future::poll_fn(|cx| {
                let _ = request.as_mut().poll(cx);
                Poll::Ready(())
            })
            .await;
        }
        for _ in 0..100 {
            if services.search.ready().await.is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }

        // ASSERT
        assert_eq!(services.store.product_count(), 1);
        let found = search(&services, "ao thun").await;
        assert_eq!(found.total, 1);
    }

    // ============================================================
    // END-TO-END: CATEGORY SLUG CHANGE
    // ============================================================

    #[tokio::test]
    async fn test_category_slug_change_moves_listing() {
        // ARRANGE
        let services = services();
        handle_create_category(
            HeaderMap::new(),
            Extension(services.config.clone()),
            Extension(services.store.clone()),
            Extension(services.dispatcher.clone()),
            Json(CreateCategoryRequest {
                name: "Giày".to_string(),
                slug: None,
            }),
        )
        .await
        .unwrap();
        create_product(
            &services,
            HeaderMap::new(),
            CreateProductRequest {
                name: "Sneaker trắng".to_string(),
                category_slug: Some("giay".to_string()),
                status: PublishStatus::Published,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(category_status(&services, "giay").await, StatusCode::OK);
        assert!(services.pages.contains("/categories/giay"));

        // ACT
        handle_update_category(
            HeaderMap::new(),
            Path("giay".to_string()),
            Extension(services.config.clone()),
            Extension(services.store.clone()),
            Extension(services.dispatcher.clone()),
            Json(UpdateCategoryRequest {
                name: Some("Giày dép".to_string()),
                slug: Some("giay-dep".to_string()),
            }),
        )
        .await
        .unwrap();

        // ASSERT
        assert!(!services.pages.contains("/categories/giay"));
        assert_eq!(category_status(&services, "giay").await, StatusCode::NOT_FOUND);
        assert_eq!(category_status(&services, "giay-dep").await, StatusCode::OK);

        let found = search(&services, "giày dép").await;
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].slug, "sneaker-trang");
    }

    // ============================================================
    // ADMIN GATE / RATE LIMIT
    // ============================================================

    #[tokio::test]
    async fn test_admin_token_is_enforced_when_configured() {
        let services = services_with(Config {
            admin_token: Some("s3cret".to_string()),
            ..Config::default()
        });

        let anonymous = create_product(&services, HeaderMap::new(), ao_thun()).await;
        assert!(matches!(anonymous, Err(AppError::Unauthorized)));

        let mut wrong = HeaderMap::new();
        wrong.insert("x-admin-token", HeaderValue::from_static("guess"));
        assert!(matches!(
            create_product(&services, wrong, ao_thun()).await,
            Err(AppError::Unauthorized)
        ));

        let mut bearer = HeaderMap::new();
        bearer.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert!(create_product(&services, bearer, ao_thun()).await.is_ok());
        assert_eq!(services.store.product_count(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_is_rate_limited() {
        let services = services_with(Config {
            rebuild_rate: RateSettings {
                limit: 1,
                window_ms: 60_000,
            },
            ..Config::default()
        });

        assert!(rebuild(&services).await.is_ok());
        let second = rebuild(&services).await;

        let Err(error) = second else {
            panic!("second rebuild should be limited");
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "60");
    }

    // ============================================================
    // DEMO DATA / EXPORT
    // ============================================================

    #[tokio::test]
    async fn test_seeded_catalog_is_searchable_and_exportable() {
        let services = services();
        seed_demo(&services).await.unwrap();

        let found = search(&services, "áo thun").await;
        let exported = handle_search_index(Extension(services.search.clone()))
            .await
            .unwrap()
            .0;

        assert_eq!(found.items[0].slug, "ao-thun-basic");
        assert!(found.items.iter().any(|item| item.slug == "phoi-do-mua-he-voi-ao-thun"));
        // Three products and one post.
        assert_eq!(exported.len(), 4);
    }
}
