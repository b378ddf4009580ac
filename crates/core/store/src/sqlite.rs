//! SQLite-backed index store.
//!
//! Schema: six relations with uniqueness constraints on the natural keys
//! and secondary indexes on every foreign key plus the stem string. All
//! writes for one piece happen inside a single transaction; synchronous
//! journaling is disabled for ingest throughput (the index is rebuildable
//! from the corpus).

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, params};

use firms_model::{Score, snippets};
use firms_stem::StemmerRegistry;

use crate::{
    IndexStore, IngestOptions, LookupMatch, PartRow, PieceRow, StoreError, StoreResult, StoreStats,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pieces (
    id   INTEGER PRIMARY KEY ASC,
    path TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE (path, name)
);
CREATE TABLE IF NOT EXISTS parts (
    id       INTEGER PRIMARY KEY ASC,
    piece_id INTEGER NOT NULL,
    name     TEXT NOT NULL,
    FOREIGN KEY (piece_id) REFERENCES pieces (id)
);
CREATE TABLE IF NOT EXISTS stemmers (
    id   INTEGER PRIMARY KEY ASC,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS snippets (
    id       INTEGER PRIMARY KEY ASC,
    piece_id INTEGER NOT NULL,
    part_id  INTEGER NOT NULL,
    offset   INTEGER NOT NULL,
    UNIQUE (piece_id, part_id, offset),
    FOREIGN KEY (piece_id) REFERENCES pieces (id),
    FOREIGN KEY (part_id) REFERENCES parts (id)
);
CREATE TABLE IF NOT EXISTS stems (
    id         INTEGER PRIMARY KEY ASC,
    stemmer_id INTEGER NOT NULL,
    stem       TEXT NOT NULL,
    UNIQUE (stemmer_id, stem),
    FOREIGN KEY (stemmer_id) REFERENCES stemmers (id)
);
CREATE TABLE IF NOT EXISTS entries (
    id         INTEGER PRIMARY KEY ASC,
    stem_id    INTEGER NOT NULL,
    snippet_id INTEGER NOT NULL,
    UNIQUE (stem_id, snippet_id),
    FOREIGN KEY (stem_id) REFERENCES stems (id),
    FOREIGN KEY (snippet_id) REFERENCES snippets (id)
);
CREATE INDEX IF NOT EXISTS piece_path_idx ON pieces (path);
CREATE INDEX IF NOT EXISTS part_piece_idx ON parts (piece_id);
CREATE INDEX IF NOT EXISTS snippet_piece_idx ON snippets (piece_id);
CREATE INDEX IF NOT EXISTS snippet_part_idx ON snippets (part_id);
CREATE INDEX IF NOT EXISTS stem_stemmer_idx ON stems (stemmer_id);
CREATE INDEX IF NOT EXISTS stem_stem_idx ON stems (stem);
CREATE INDEX IF NOT EXISTS entry_stem_idx ON entries (stem_id);
CREATE INDEX IF NOT EXISTS entry_snippet_idx ON entries (snippet_id);
";

const LOOKUP_SQL: &str = "
SELECT snippets.id, snippets.piece_id, snippets.part_id, snippets.offset, stems.id
FROM snippets
JOIN entries ON entries.snippet_id = snippets.id
JOIN stems ON stems.id = entries.stem_id
JOIN stemmers ON stemmers.id = stems.stemmer_id
WHERE stemmers.name = ?1 AND stems.stem = ?2
";

/// Durable index store over a single SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a fresh index at `path`, wiping any existing database.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path).map_err(|source| StoreError::File {
                op: "remove existing database",
                source,
            })?;
        }
        Self::open(path)
    }

    /// Open (or initialize) the index at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(StoreError::io("open database"))?;
        Self::from_connection(conn)
    }

    /// An in-memory database, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::io("open database"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA synchronous = OFF; PRAGMA journal_mode = MEMORY;")
            .map_err(StoreError::io("set pragmas"))?;
        conn.execute_batch(SCHEMA)
            .map_err(StoreError::io("create schema"))?;
        Ok(Self { conn })
    }

    fn count(&self, table: &'static str) -> StoreResult<u64> {
        // Table names come from a fixed internal list, never from input.
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(StoreError::io("count rows"))
    }
}

/// `INSERT OR IGNORE` + re-`SELECT` of the id.
///
/// `last_insert_rowid` is stale when the insert was ignored, so the id is
/// always re-read through the unique key.
fn ensure_piece(tx: &Transaction<'_>, path: &str, name: &str) -> StoreResult<i64> {
    tx.execute(
        "INSERT OR IGNORE INTO pieces (path, name) VALUES (?1, ?2)",
        params![path, name],
    )
    .map_err(StoreError::io("insert piece"))?;
    tx.query_row(
        "SELECT id FROM pieces WHERE path = ?1 AND name = ?2",
        params![path, name],
        |row| row.get(0),
    )
    .map_err(StoreError::io("select piece id"))
}

/// Resolve a part by its ordinal within the piece.
///
/// Part names need not be unique (divisi scores repeat them), so the
/// ingest-order index identifies the row, the same way synthetic
/// `Part {k}` names disambiguate unnamed parts. Re-ingesting a piece
/// walks the same ordinals and reuses the existing rows.
fn ensure_part(
    tx: &Transaction<'_>,
    piece_id: i64,
    index: usize,
    name: &str,
) -> StoreResult<i64> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM parts WHERE piece_id = ?1 ORDER BY id LIMIT 1 OFFSET ?2",
            params![piece_id, index as i64],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::io("select part id"))?;
    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO parts (piece_id, name) VALUES (?1, ?2)",
        params![piece_id, name],
    )
    .map_err(StoreError::io("insert part"))?;
    Ok(tx.last_insert_rowid())
}

fn ensure_stemmer(tx: &Transaction<'_>, name: &str) -> StoreResult<i64> {
    tx.execute(
        "INSERT OR IGNORE INTO stemmers (name) VALUES (?1)",
        params![name],
    )
    .map_err(StoreError::io("insert stemmer"))?;
    tx.query_row(
        "SELECT id FROM stemmers WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .map_err(StoreError::io("select stemmer id"))
}

impl IndexStore for SqliteStore {
    fn add_piece(
        &mut self,
        score: &Score,
        path: &str,
        stemmers: &StemmerRegistry,
        options: &IngestOptions,
    ) -> StoreResult<i64> {
        let tx = self
            .conn
            .transaction()
            .map_err(StoreError::io("begin piece transaction"))?;

        let piece_id = ensure_piece(&tx, path, &score.display_title())?;
        let stemmer_ids: Vec<(&dyn firms_stem::Stemmer, i64)> = {
            let mut ids = Vec::with_capacity(stemmers.len());
            for stemmer in stemmers.iter() {
                ids.push((stemmer, ensure_stemmer(&tx, stemmer.name())?));
            }
            ids
        };

        for (index, part) in score.parts.iter().enumerate() {
            let part_name = part.display_name(index);
            let part_id = ensure_part(&tx, piece_id, index, &part_name)?;

            let events = if options.explicit_repeats {
                match part.expand_repeats() {
                    Ok(events) => events,
                    Err(err) => {
                        tracing::debug!(
                            part = %part_name,
                            %err,
                            "repeat expansion failed, falling back to notated order"
                        );
                        part.events.clone()
                    }
                }
            } else {
                part.events.clone()
            };
            let windows: Vec<_> = snippets(&events, options.window).collect();

            let mut snippet_ids = Vec::with_capacity(windows.len());
            {
                let mut insert = tx
                    .prepare_cached(
                        "INSERT OR IGNORE INTO snippets (piece_id, part_id, offset) \
                         VALUES (?1, ?2, ?3)",
                    )
                    .map_err(StoreError::io("prepare snippet insert"))?;
                let mut select = tx
                    .prepare_cached(
                        "SELECT id FROM snippets \
                         WHERE piece_id = ?1 AND part_id = ?2 AND offset = ?3",
                    )
                    .map_err(StoreError::io("prepare snippet select"))?;
                for snippet in &windows {
                    let offset = snippet.offset() as i64;
                    insert
                        .execute(params![piece_id, part_id, offset])
                        .map_err(StoreError::io("insert snippet"))?;
                    let id: i64 = select
                        .query_row(params![piece_id, part_id, offset], |row| row.get(0))
                        .map_err(StoreError::io("select snippet id"))?;
                    snippet_ids.push(id);
                }
            }

            {
                let mut insert_stem = tx
                    .prepare_cached(
                        "INSERT OR IGNORE INTO stems (stemmer_id, stem) VALUES (?1, ?2)",
                    )
                    .map_err(StoreError::io("prepare stem insert"))?;
                let mut select_stem = tx
                    .prepare_cached("SELECT id FROM stems WHERE stemmer_id = ?1 AND stem = ?2")
                    .map_err(StoreError::io("prepare stem select"))?;
                let mut insert_entry = tx
                    .prepare_cached(
                        "INSERT OR IGNORE INTO entries (stem_id, snippet_id) VALUES (?1, ?2)",
                    )
                    .map_err(StoreError::io("prepare entry insert"))?;

                for (stemmer, stemmer_id) in &stemmer_ids {
                    for (snippet, snippet_id) in windows.iter().zip(&snippet_ids) {
                        let stems = match stemmer.stem(snippet) {
                            Ok(stems) => stems,
                            Err(err) => {
                                tracing::warn!(
                                    stemmer = stemmer.name(),
                                    part = %part_name,
                                    offset = snippet.offset(),
                                    %err,
                                    "unable to process snippet, skipping"
                                );
                                continue;
                            }
                        };
                        for stem in stems {
                            insert_stem
                                .execute(params![stemmer_id, stem])
                                .map_err(StoreError::io("insert stem"))?;
                            let stem_id: i64 = select_stem
                                .query_row(params![stemmer_id, stem], |row| row.get(0))
                                .map_err(StoreError::io("select stem id"))?;
                            insert_entry
                                .execute(params![stem_id, snippet_id])
                                .map_err(StoreError::io("insert entry"))?;
                        }
                    }
                }
            }
        }

        tx.commit().map_err(StoreError::io("commit piece"))?;
        Ok(piece_id)
    }

    fn lookup(&self, stemmer_name: &str, stems: &[String]) -> StoreResult<Vec<LookupMatch>> {
        let mut stmt = self
            .conn
            .prepare_cached(LOOKUP_SQL)
            .map_err(StoreError::io("prepare lookup"))?;
        let mut matches = Vec::new();
        for stem in stems {
            let rows = stmt
                .query_map(params![stemmer_name, stem], |row| {
                    Ok(LookupMatch {
                        snippet_id: row.get(0)?,
                        piece_id: row.get(1)?,
                        part_id: row.get(2)?,
                        offset: row.get(3)?,
                        stem_id: row.get(4)?,
                        stemmer: stemmer_name.to_string(),
                    })
                })
                .map_err(StoreError::io("run lookup"))?;
            for row in rows {
                matches.push(row.map_err(StoreError::io("read lookup row"))?);
            }
        }
        Ok(matches)
    }

    fn corpus_size(&self) -> StoreResult<u64> {
        self.count("pieces")
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            pieces: self.count("pieces")?,
            parts: self.count("parts")?,
            snippets: self.count("snippets")?,
            stemmers: self.count("stemmers")?,
            stems: self.count("stems")?,
            entries: self.count("entries")?,
        })
    }

    fn pieces(&self) -> StoreResult<Vec<PieceRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, path, name FROM pieces ORDER BY id")
            .map_err(StoreError::io("prepare piece listing"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PieceRow {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    name: row.get(2)?,
                })
            })
            .map_err(StoreError::io("list pieces"))?;
        let mut pieces = Vec::new();
        for row in rows {
            pieces.push(row.map_err(StoreError::io("read piece row"))?);
        }
        Ok(pieces)
    }

    fn piece(&self, id: i64) -> StoreResult<Option<PieceRow>> {
        self.conn
            .query_row(
                "SELECT id, path, name FROM pieces WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PieceRow {
                        id: row.get(0)?,
                        path: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::io("select piece"))
    }

    fn parts_of(&self, piece_id: i64) -> StoreResult<Vec<PartRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, piece_id, name FROM parts WHERE piece_id = ?1 ORDER BY id")
            .map_err(StoreError::io("prepare part listing"))?;
        let rows = stmt
            .query_map(params![piece_id], |row| {
                Ok(PartRow {
                    id: row.get(0)?,
                    piece_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })
            .map_err(StoreError::io("list parts"))?;
        let mut parts = Vec::new();
        for row in rows {
            parts.push(row.map_err(StoreError::io("read part row"))?);
        }
        Ok(parts)
    }

    fn paths_matching(&self, needle: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT path FROM pieces WHERE instr(path, ?1) > 0 ORDER BY path",
            )
            .map_err(StoreError::io("prepare path search"))?;
        let rows = stmt
            .query_map(params![needle], |row| row.get::<_, String>(0))
            .map_err(StoreError::io("search paths"))?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.map_err(StoreError::io("read path row"))?);
        }
        Ok(paths)
    }
}
