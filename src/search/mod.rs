//! Search Module
//!
//! Product and post search over an in-memory index.
//!
//! ## Pipeline
//! 1. **Build** (`index`): visible catalog records become flat `IndexEntry` values with
//!    a folded searchable blob.
//! 2. **Cache** (`cache`): the built index is held behind a single-flight rebuild and
//!    dropped on invalidation; the next query rebuilds it.
//! 3. **Query** (`engine`): the query is folded and tokenized, every entry is scored,
//!    and hits come back ranked with highlight spans into the original text.
//!
//! ## Submodules
//! - **`tokenizer`**: diacritic folding with offset tracking, word extraction.
//! - **`index`**: index builder.
//! - **`engine`**: scoring, ranking, highlighting, limit clamping.
//! - **`cache`**: `SearchIndexCache` lifecycle (`EMPTY -> BUILDING -> READY`).
//! - **`snapshot`**: JSON snapshot of the last build for cold-start export.
//! - **`handlers`**: `/search`, `/search-index`, `/admin/rebuild-search`.
//! - **`types`**: index records and API payloads.

pub mod cache;
pub mod engine;
pub mod handlers;
pub mod index;
pub mod snapshot;
pub mod tokenizer;
pub mod types;
