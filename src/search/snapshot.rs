//! Persisted index snapshot.
//!
//! After each successful build the entries are written as a JSON array so a freshly
//! started process can serve `/search-index` before it has touched the catalog.

use super::types::IndexEntry;

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// A store that never reads or writes anything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// `Ok(None)` when disabled or when no snapshot has been written yet.
    pub async fn load(&self) -> Result<Option<Vec<IndexEntry>>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading snapshot {}", path.display()));
            }
        };

        let entries: Vec<IndexEntry> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;
        Ok(Some(entries))
    }

    /// Writes to a sibling temp file and renames it over the snapshot, so readers never
    /// observe a half-written file.
    pub async fn persist(&self, entries: &[IndexEntry]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let json = serde_json::to_vec(entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;

        tracing::debug!("Persisted {} index entries to {}", entries.len(), path.display());
        Ok(())
    }
}
