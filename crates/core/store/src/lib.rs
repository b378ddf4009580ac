//! Persistent inverted index for FIRMS.
//!
//! The store owns every persistent entity: pieces, parts, snippets,
//! stemmers, stems, and the many-to-many entries relation between stems and
//! snippets. Two implementations share the [`IndexStore`] trait:
//!
//! - [`SqliteStore`] — the durable store, one SQLite file per index
//! - [`MemoryStore`] — hash maps, for tests and ephemeral sessions
//!
//! Ingest is bulk-oriented: one transaction per piece, uniqueness conflicts
//! treated as "already present". Lookup returns every matching
//! (stem, snippet) row *including duplicates* — a stem matching several
//! windows of a query raises term frequency, which the graders rely on.

use serde::Serialize;

use firms_model::Score;
use firms_stem::StemmerRegistry;
use thiserror::Error;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Storage failure, tagged with the operation that produced it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{op} failed: {source}")]
    File {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Error-mapping helper: `conn.execute(…).map_err(StoreError::io("insert piece"))`.
    pub fn io(op: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
        move |source| StoreError::Io { op, source }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Rows & options
// ---------------------------------------------------------------------------

/// A piece row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieceRow {
    pub id: i64,
    pub path: String,
    pub name: String,
}

/// A part row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartRow {
    pub id: i64,
    pub piece_id: i64,
    pub name: String,
}

/// Row counts per relation, for the `info` surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub pieces: u64,
    pub parts: u64,
    pub snippets: u64,
    pub stemmers: u64,
    pub stems: u64,
    pub entries: u64,
}

/// One index hit: a stem of a stored snippet matched a query stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupMatch {
    pub snippet_id: i64,
    pub piece_id: i64,
    pub part_id: i64,
    pub offset: i64,
    pub stem_id: i64,
    pub stemmer: String,
}

/// Knobs for the per-piece insert path.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Snippet window size, in notes-and-rests.
    pub window: usize,
    /// Attempt to unroll repeat spans into played order before windowing.
    /// Expansion is best-effort; failures fall back to the notated order.
    pub explicit_repeats: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            window: firms_model::DEFAULT_WINDOW,
            explicit_repeats: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The persistent index over `(stemmer, stem) ↔ snippet`.
pub trait IndexStore {
    /// Ingest one parsed piece: upsert the piece and its parts, window every
    /// part into snippets, stem each snippet with every registered stemmer,
    /// and record the stem → snippet entries.
    ///
    /// Idempotent per `(path, title)`; re-adding a piece is a no-op at the
    /// row level. Per-snippet stemming failures (malformed chords) are
    /// logged and skipped. Returns the piece id.
    fn add_piece(
        &mut self,
        score: &Score,
        path: &str,
        stemmers: &StemmerRegistry,
        options: &IngestOptions,
    ) -> StoreResult<i64>;

    /// All `(stem, snippet)` rows whose stemmer matches `stemmer_name` and
    /// whose stem string is one of `stems`. Duplicates are preserved.
    fn lookup(&self, stemmer_name: &str, stems: &[String]) -> StoreResult<Vec<LookupMatch>>;

    /// Number of pieces in the corpus.
    fn corpus_size(&self) -> StoreResult<u64>;

    /// Row counts per relation.
    fn stats(&self) -> StoreResult<StoreStats>;

    /// All piece rows.
    fn pieces(&self) -> StoreResult<Vec<PieceRow>>;

    /// One piece row by id.
    fn piece(&self, id: i64) -> StoreResult<Option<PieceRow>>;

    /// The parts of a piece.
    fn parts_of(&self, piece_id: i64) -> StoreResult<Vec<PartRow>>;

    /// Stored piece paths containing `needle`.
    fn paths_matching(&self, needle: &str) -> StoreResult<Vec<String>>;
}
