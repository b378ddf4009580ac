//! Retrieval engine for FIRMS.
//!
//! The engine wires the pipeline together: score readers produce model
//! scores, the store windows and stems them at ingest, and queries run the
//! same stemming over the query snippet list, feeding lookup matches into
//! every registered grader.
//!
//! - [`Engine`] — ingest and query orchestration
//! - [`corpus`] — composer-keyed corpus enumeration
//! - [`evaluate`] — synthetic-error evaluation harness

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use firms_grade::{Grader, GraderMatch, GraderResult};
use firms_model::{DEFAULT_WINDOW, Part, Score, snippets};
use firms_notation::{NotationError, NotationRegistry};
use firms_stem::{StemError, StemmerRegistry};
use firms_store::{IndexStore, IngestOptions, StoreError};

pub mod corpus;
pub mod evaluate;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Stem(#[from] StemError),

    #[error("nothing to evaluate: the index holds no pieces")]
    EmptyCorpus,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A query as the caller hands it over.
pub enum QueryInput {
    /// Terse textual notation.
    Tiny(String),
    /// An already-parsed score fragment.
    Score(Score),
}

/// Summary of a bulk ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
}

/// The retrieval engine.
///
/// Generic over the store so the same orchestration serves the durable
/// SQLite index and the in-memory one.
pub struct Engine<S> {
    store: S,
    stemmers: StemmerRegistry,
    graders: Vec<Box<dyn Grader>>,
    notation: NotationRegistry,
    window: usize,
}

impl<S: IndexStore> Engine<S> {
    /// Assemble an engine from its parts.
    pub fn new(store: S, notation: NotationRegistry) -> Self {
        Self {
            store,
            stemmers: StemmerRegistry::standard(),
            graders: firms_grade::default_graders(),
            notation,
            window: DEFAULT_WINDOW,
        }
    }

    /// Replace the grader line-up.
    pub fn with_graders(mut self, graders: Vec<Box<dyn Grader>>) -> Self {
        self.graders = graders;
        self
    }

    /// Replace the stemmer set.
    pub fn with_stemmers(mut self, stemmers: StemmerRegistry) -> Self {
        self.stemmers = stemmers;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notation(&self) -> &NotationRegistry {
        &self.notation
    }

    /// Ingest a parsed piece under its origin path.
    pub fn add_piece(
        &mut self,
        score: &Score,
        path: &str,
        explicit_repeats: bool,
    ) -> EngineResult<i64> {
        let options = IngestOptions {
            window: self.window,
            explicit_repeats,
        };
        Ok(self
            .store
            .add_piece(score, path, &self.stemmers, &options)?)
    }

    /// Parse and ingest one score file. Fatal on any failure.
    pub fn add_piece_file(&mut self, path: &Path, explicit_repeats: bool) -> EngineResult<i64> {
        let score = self.notation.read_path(path)?;
        self.add_piece(&score, &path.display().to_string(), explicit_repeats)
    }

    /// Ingest a batch of score files, best-effort: pieces that fail to
    /// parse or store are logged and skipped. `observe` is called after
    /// each attempt (progress reporting).
    pub fn add_piece_files(
        &mut self,
        paths: &[PathBuf],
        explicit_repeats: bool,
        mut observe: impl FnMut(&Path, bool),
    ) -> IngestReport {
        let mut report = IngestReport::default();
        for path in paths {
            match self.add_piece_file(path, explicit_repeats) {
                Ok(_) => {
                    report.ingested += 1;
                    observe(path, true);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping piece");
                    report.skipped += 1;
                    observe(path, false);
                }
            }
        }
        report
    }

    /// Run a query and return grades per grader, in registration order.
    ///
    /// Every grader is reset first. The query is flattened into a single
    /// synthetic part and windowed once; the snippet list is then replayed
    /// per stemmer. Failures at query time propagate.
    pub fn query(
        &mut self,
        input: QueryInput,
    ) -> EngineResult<IndexMap<String, Vec<GraderResult>>> {
        for grader in &mut self.graders {
            grader.reset();
        }

        let score = match input {
            QueryInput::Score(score) => score,
            QueryInput::Tiny(text) => {
                let reader = self
                    .notation
                    .find_reader_by_id("tiny")
                    .ok_or_else(|| NotationError::UnknownFormat("tiny".into()))?;
                reader.read(text.as_bytes())?
            }
        };
        let mut query_part = Part::new(Some("query".into()));
        query_part.events = score.flattened_events();

        // Materialized once: the same windows are iterated per stemmer.
        let windows: Vec<_> = snippets(&query_part.events, self.window).collect();

        for stemmer in self.stemmers.iter() {
            for window in &windows {
                let stems = stemmer.stem(window)?;
                let matches = self.store.lookup(stemmer.name(), &stems)?;
                if matches.is_empty() {
                    continue;
                }
                let batch: Vec<GraderMatch> = matches
                    .into_iter()
                    .map(|lookup| GraderMatch::new(stemmer.name(), lookup))
                    .collect();
                for grader in &mut self.graders {
                    grader.aggregate(&batch);
                }
            }
        }

        let corpus_size = self.store.corpus_size()?;
        let mut grades = IndexMap::new();
        for grader in &self.graders {
            grades.insert(grader.name().to_string(), grader.grade(corpus_size));
        }
        Ok(grades)
    }
}
