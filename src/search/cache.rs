//! Search Index Cache
//!
//! Owns the lifecycle of the in-memory index: `EMPTY -> BUILDING -> READY`, and back to
//! `EMPTY` on invalidation. Rebuilds are lazy (first query after an invalidation) or
//! explicit (admin endpoint).
//!
//! ## Single-flight
//! `rebuild_lock` admits one build at a time. Callers that queued behind a build
//! re-check the state once they get the lock and return the index that build installed,
//! so concurrent cold queries cost one catalog read.
//!
//! ## Generations
//! Every invalidation bumps `generation` under the state write lock. A build only
//! installs its result if the generation it started with is still current; otherwise
//! the result goes back to its own caller and the cache stays `EMPTY`, so a read that
//! begins after a write can never observe an index built before it.
//!
//! ## Scheduled publications
//! An index built while something is scheduled carries that publish time in
//! `expires_at`. Once the clock passes it the installed index counts as `EMPTY`.

use super::index::build_index;
use super::snapshot::SnapshotStore;
use super::types::{CacheState, CacheStatus, IndexEntry, SearchIndex};
use crate::catalog::source::CatalogSource;
use crate::clock::Clock;
use crate::error::AppError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

enum Slot {
    Empty,
    Ready(Arc<SearchIndex>),
}

pub struct SearchIndexCache {
    source: Arc<dyn CatalogSource>,
    clock: Arc<dyn Clock>,
    snapshot: SnapshotStore,
    state: RwLock<Slot>,
    rebuild_lock: Mutex<()>,
    /// Most recent successful build, served when the source is down.
    last_good: RwLock<Option<Arc<SearchIndex>>>,
    /// Snapshot entries loaded from disk for export before the first build.
    exported: RwLock<Option<Arc<Vec<IndexEntry>>>>,
    generation: AtomicU64,
    rebuilds: AtomicU64,
    has_built: AtomicBool,
}

impl SearchIndexCache {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        clock: Arc<dyn Clock>,
        snapshot: SnapshotStore,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            clock,
            snapshot,
            state: RwLock::new(Slot::Empty),
            rebuild_lock: Mutex::new(()),
            last_good: RwLock::new(None),
            exported: RwLock::new(None),
            generation: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
            has_built: AtomicBool::new(false),
        })
    }

    /// The installed index, if the cache is `READY` and no scheduled entity has gone
    /// live since it was built.
    pub async fn ready(&self) -> Option<Arc<SearchIndex>> {
        match &*self.state.read().await {
            Slot::Ready(index) if !index.is_expired(self.clock.now_ms()) => Some(index.clone()),
            _ => None,
        }
    }

    /// Returns the current index, building it first if the cache is empty.
    ///
    /// If the build fails the last good index is returned instead; only a failure with
    /// nothing to fall back on is an error.
    pub async fn get(&self) -> Result<Arc<SearchIndex>, AppError> {
        if let Some(index) = self.ready().await {
            return Ok(index);
        }

        let _guard = self.rebuild_lock.lock().await;
        if let Some(index) = self.ready().await {
            tracing::debug!("Joined search index build finished by another caller");
            return Ok(index);
        }

        self.build_locked(true).await
    }

    /// Forces a build regardless of state. Failures are reported, not papered over.
    pub async fn rebuild(&self) -> Result<Arc<SearchIndex>, AppError> {
        let _guard = self.rebuild_lock.lock().await;
        self.build_locked(false).await
    }

    /// Marks the cache `EMPTY`; the next `get` rebuilds.
    pub async fn invalidate(&self) {
        {
            let mut state = self.state.write().await;
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = Slot::Empty;
        }
        *self.exported.write().await = None;

        tracing::debug!(
            "Search index invalidated (generation {})",
            self.generation.load(Ordering::SeqCst)
        );
    }

    pub async fn status(&self) -> CacheStatus {
        let building = self.rebuild_lock.try_lock().is_err();
        let generation = self.generation.load(Ordering::SeqCst);
        let rebuilds = self.rebuilds.load(Ordering::SeqCst);

        match self.ready().await {
            Some(index) => CacheStatus {
                state: CacheState::Ready,
                entries: Some(index.len()),
                built_at: Some(index.built_at),
                generation,
                rebuilds,
            },
            None => CacheStatus {
                state: if building {
                    CacheState::Building
                } else {
                    CacheState::Empty
                },
                entries: None,
                built_at: None,
                generation,
                rebuilds,
            },
        }
    }

    /// Entries for offline/precache consumers.
    ///
    /// Serves the live index when `READY`. On a cold process (nothing built, nothing
    /// invalidated) the persisted snapshot is loaded once and kept in memory; otherwise
    /// the index is built lazily.
    pub async fn export(&self) -> Result<Vec<IndexEntry>, AppError> {
        if let Some(index) = self.ready().await {
            return Ok(index.entries.clone());
        }

        if let Some(entries) = self.exported.read().await.as_ref() {
            return Ok(entries.to_vec());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        if generation == 0 && !self.has_built.load(Ordering::SeqCst) {
            match self.snapshot.load().await {
                Ok(Some(entries)) => {
                    let entries = Arc::new(entries);
                    let mut memo = self.exported.write().await;
                    if self.generation.load(Ordering::SeqCst) == generation {
                        *memo = Some(entries.clone());
                    }
                    tracing::info!("Serving search index export from snapshot ({} entries)", entries.len());
                    return Ok(entries.to_vec());
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring unreadable search snapshot: {:#}", e),
            }
        }

        let index = self.get().await?;
        Ok(index.entries.clone())
    }

    async fn build_locked(&self, allow_stale: bool) -> Result<Arc<SearchIndex>, AppError> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Rebuilding search index (generation {})", generation);

        match build_index(self.source.as_ref(), self.clock.now_ms()).await {
            Ok(index) => {
                let index = Arc::new(index);
                let installed = {
                    let mut state = self.state.write().await;
                    let current = self.generation.load(Ordering::SeqCst) == generation;
                    if current {
                        *state = Slot::Ready(index.clone());
                    }
                    current
                };

                if !installed {
                    tracing::info!("Search index invalidated during build; not installing");
                    return Ok(index);
                }
                tracing::info!("Search index ready with {} entries", index.len());

                *self.last_good.write().await = Some(index.clone());
                self.has_built.store(true, Ordering::SeqCst);

                if let Err(e) = self.snapshot.persist(&index.entries).await {
                    tracing::warn!("Failed to persist search snapshot: {:#}", e);
                }

                Ok(index)
            }
            Err(e) => {
                tracing::error!("Search index rebuild failed: {:#}", e);
                if allow_stale && let Some(stale) = self.last_good.read().await.clone() {
                    tracing::warn!(
                        "Serving stale search index built at {} ({} entries)",
                        stale.built_at,
                        stale.len()
                    );
                    return Ok(stale);
                }
                Err(AppError::DataUnavailable(format!("{e:#}")))
            }
        }
    }
}
