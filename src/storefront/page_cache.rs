//! Rendered page cache.
//!
//! Holds rendered storefront pages keyed by route path until the invalidation
//! dispatcher revalidates them or their `expires_at` passes. Only successful renders
//! are stored.

use crate::clock::{Clock, SystemClock};
use crate::error::AppError;

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub content_type: &'static str,
    pub body: String,
    pub expires_at: Option<u64>,
}

impl RenderedPage {
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, AppError> {
        let body = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("rendering page: {e}")))?;
        Ok(Self {
            content_type: "application/json",
            body,
            expires_at: None,
        })
    }

    pub fn xml(body: String) -> Self {
        Self {
            content_type: "application/xml",
            body,
            expires_at: None,
        }
    }

    /// Marks the page stale from `at` on, e.g. when a scheduled product goes live.
    pub fn expiring_at(mut self, at: Option<u64>) -> Self {
        self.expires_at = at;
        self
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

pub struct PageCache {
    clock: Arc<dyn Clock>,
    pages: DashMap<String, Arc<RenderedPage>>,
    /// Bumped by every revalidation; renders that straddle one are not stored.
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageCache {
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            pages: DashMap::new(),
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub async fn get_or_render<F, Fut>(
        &self,
        path: &str,
        render: F,
    ) -> Result<Arc<RenderedPage>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RenderedPage, AppError>>,
    {
        let cached = self.pages.get(path).map(|entry| entry.value().clone());
        match cached {
            Some(page) if !page.is_expired(self.clock.now_ms()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(page);
            }
            Some(_) => {
                tracing::debug!("Page {} passed a scheduled publication, re-rendering", path);
            }
            None => {}
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let epoch = self.epoch.load(Ordering::SeqCst);
        let page = Arc::new(render().await?);

        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.pages.insert(path.to_string(), page.clone());
        } else {
            tracing::debug!("Page {} revalidated while rendering, not caching", path);
        }

        Ok(page)
    }

    /// Evicts the given paths. A path ending in `*` evicts every cached path starting
    /// with the text before it.
    pub fn revalidate(&self, paths: &[String]) -> usize {
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let mut evicted = 0;
        for path in paths {
            match path.strip_suffix('*') {
                Some(prefix) => {
                    let before = self.pages.len();
                    self.pages.retain(|key, _| !key.starts_with(prefix));
                    evicted += before.saturating_sub(self.pages.len());
                }
                None => {
                    if self.pages.remove(path.as_str()).is_some() {
                        evicted += 1;
                    }
                }
            }
        }

        tracing::debug!("Revalidated {} paths, evicted {} pages", paths.len(), evicted);
        evicted
    }

    pub fn contains(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
