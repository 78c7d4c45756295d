use std::sync::Arc;
use std::time::Duration;

use storefront_search::app::{Services, router, seed_demo, shutdown_signal};
use storefront_search::clock::SystemClock;
use storefront_search::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Configuration:
    let config = Config::load()?;
    tracing::info!("Starting storefront search on {}", config.bind_addr);
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes are open");
    }

    // 2. Services and invalidation wiring:
    let services = Services::new(config, Arc::new(SystemClock));
    if services.config.seed_demo {
        seed_demo(&services).await?;
    }

    // 3. Spawn rate limit janitor:
    let limiter = services.limiter.clone();
    let longest_window = services
        .config
        .search_rate
        .window_ms
        .max(services.config.rebuild_rate.window_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(longest_window.max(1_000)));

        loop {
            interval.tick().await;
            let purged = limiter.purge_expired(longest_window);
            if purged > 0 {
                tracing::debug!("Purged {} expired rate limit buckets", purged);
            }
        }
    });

    // 4. HTTP Router:
    let app = router(&services);

    // 5. Start HTTP server:
    let listener = tokio::net::TcpListener::bind(services.config.bind_addr).await?;
    tracing::info!("HTTP server listening on {}", services.config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
