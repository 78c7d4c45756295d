use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Product,
    Post,
}

/// One searchable record. Built from a visible product or post; never mutated after
/// the index that holds it is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Folded name, description and category name.
    pub searchable: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    pub entries: Vec<IndexEntry>,
    pub built_at: u64,
    /// Publish time of the next scheduled entity; the index is stale from then on.
    pub expires_at: Option<u64>,
}

impl SearchIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Inclusive `[start, end]` char range inside one field. Serialized as a two-element array.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct HighlightSpan(pub usize, pub usize);

impl HighlightSpan {
    pub fn start(&self) -> usize {
        self.0
    }

    pub fn end(&self) -> usize {
        self.1
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldHighlights {
    pub name: Vec<HighlightSpan>,
    pub description: Vec<HighlightSpan>,
}

/// A ranked match. Transient: produced per query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Position of the entry in the index, the final tie-breaker.
    pub position: usize,
    pub entry: IndexEntry,
    pub score: u32,
    pub name_matched: bool,
    pub highlights: FieldHighlights,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

// --- API ---

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    /// Kept as text so a malformed value falls back to the default instead of a 400.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub items: Vec<SearchResultItem>,
}

impl SearchResponse {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            total: 0,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub score: u32,
    pub highlights: FieldHighlights,
}

impl From<SearchHit> for SearchResultItem {
    fn from(hit: SearchHit) -> Self {
        Self {
            kind: hit.entry.kind,
            slug: hit.entry.slug,
            name: hit.entry.name,
            description: hit.entry.description,
            score: hit.score,
            highlights: hit.highlights,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub status: String,
    pub entries: usize,
    pub built_at: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Building,
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub state: CacheState,
    pub entries: Option<usize>,
    pub built_at: Option<u64>,
    pub generation: u64,
    pub rebuilds: u64,
}
