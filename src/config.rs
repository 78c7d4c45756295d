//! Environment-driven configuration.
//!
//! Every setting has a default so the service starts with an empty environment; each
//! fallback is logged once at startup.

use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::invalidation::policy::CategoryInvalidationPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Absolute origin used in sitemap URLs.
    pub site_url: String,
    /// Shared secret for `/admin/*`. `None` leaves admin routes open.
    pub admin_token: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub search: SearchSettings,
    pub search_rate: RateSettings,
    pub rebuild_rate: RateSettings,
    pub category_policy: CategoryInvalidationPolicy,
    pub seed_demo: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub min_query_chars: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RateSettings {
    pub limit: u32,
    pub window_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_query_chars: 2,
            default_limit: 10,
            max_limit: 25,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            site_url: "http://localhost:3000".to_string(),
            admin_token: None,
            snapshot_path: None,
            search: SearchSettings::default(),
            search_rate: RateSettings {
                limit: 60,
                window_ms: 60_000,
            },
            rebuild_rate: RateSettings {
                limit: 5,
                window_ms: 60_000,
            },
            category_policy: CategoryInvalidationPolicy::default(),
            seed_demo: false,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let search = SearchSettings {
            min_query_chars: try_load("SEARCH_MIN_QUERY_CHARS", "2")?,
            default_limit: try_load("SEARCH_DEFAULT_LIMIT", "10")?,
            max_limit: try_load("SEARCH_MAX_LIMIT", "25")?,
        };

        if search.max_limit == 0 || search.default_limit > search.max_limit {
            anyhow::bail!(
                "SEARCH_DEFAULT_LIMIT ({}) must be within 1..=SEARCH_MAX_LIMIT ({})",
                search.default_limit,
                search.max_limit
            );
        }

        Ok(Self {
            bind_addr: try_load("BIND_ADDR", "127.0.0.1:3000")?,
            site_url: try_load::<String>("SITE_URL", "http://localhost:3000")?
                .trim_end_matches('/')
                .to_string(),
            admin_token: optional("ADMIN_TOKEN"),
            snapshot_path: optional("SEARCH_SNAPSHOT_PATH").map(PathBuf::from),
            search,
            search_rate: RateSettings {
                limit: try_load("SEARCH_RATE_LIMIT", "60")?,
                window_ms: try_load("SEARCH_RATE_WINDOW_MS", "60000")?,
            },
            rebuild_rate: RateSettings {
                limit: try_load("REBUILD_RATE_LIMIT", "5")?,
                window_ms: try_load("REBUILD_RATE_WINDOW_MS", "60000")?,
            },
            category_policy: try_load("CATEGORY_INVALIDATION_POLICY", "referencing")?,
            seed_demo: try_load("SEED_DEMO", "false")?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("invalid {key}={raw}: {e}")
    })
}
