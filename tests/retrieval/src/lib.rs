//! Shared fixtures for the cross-crate retrieval tests.

use std::path::Path;

use firms_engine::Engine;
use firms_model::Score;
use firms_notation::NotationRegistry;
use firms_store::SqliteStore;

/// A registry with every compiled-in reader.
pub fn registry() -> NotationRegistry {
    let mut registry = NotationRegistry::new();
    registry.register(Box::new(firms_tiny::TinyFormat));
    registry.register(Box::new(firms_musicxml::MusicXmlFormat));
    registry
}

/// An engine over a fresh on-disk SQLite index inside `dir`.
pub fn sqlite_engine(dir: &Path) -> Engine<SqliteStore> {
    let store = SqliteStore::create(dir.join("firms.sqlite.db")).expect("create index");
    Engine::new(store, registry())
}

/// Parse terse notation, panicking on failure.
pub fn tiny(text: &str) -> Score {
    firms_tiny::parse(text).expect("valid tiny notation")
}

/// Sort a grader's results best-first and return the piece ids in order.
pub fn ranking(results: &[firms_grade::GraderResult]) -> Vec<i64> {
    let mut ordered = results.to_vec();
    ordered.sort_by(|a, b| b.grade.partial_cmp(&a.grade).expect("finite grades"));
    ordered.iter().map(|r| r.piece_id).collect()
}
