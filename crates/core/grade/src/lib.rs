//! Graders: stateful aggregators from match records to per-piece scores.
//!
//! A grader is fed batches of [`GraderMatch`]es during a query — one batch
//! per (stemmer, query-snippet) lookup — and finally asked to grade the
//! accumulated state against the corpus size. Aggregation is commutative
//! and associative over batches, so lookup order never changes grades.
//! Grades are not normalized and ties are broken by the caller.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use firms_store::LookupMatch;

mod bm25;
mod logsum;

pub use bm25::Bm25Grader;
pub use logsum::LogWeightedSumGrader;

/// One lookup hit tagged with the stemmer channel it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GraderMatch {
    pub stemmer: String,
    pub lookup: LookupMatch,
}

impl GraderMatch {
    pub fn new(stemmer: impl Into<String>, lookup: LookupMatch) -> Self {
        Self {
            stemmer: stemmer.into(),
            lookup,
        }
    }
}

/// A graded piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraderResult {
    pub piece_id: i64,
    pub grade: f64,
    /// Free-form per-result annotations.
    pub meta: BTreeMap<String, String>,
}

impl GraderResult {
    pub fn new(piece_id: i64, grade: f64) -> Self {
        Self {
            piece_id,
            grade,
            meta: BTreeMap::new(),
        }
    }
}

/// A reusable scoring strategy.
///
/// Graders hold only transient per-query state; the engine calls `reset`
/// at the start of every query.
pub trait Grader {
    /// Display name, used as the key of the query result map.
    fn name(&self) -> &'static str;

    /// Drop all aggregator state.
    fn reset(&mut self);

    /// Fold one batch of matches into the aggregator.
    fn aggregate(&mut self, matches: &[GraderMatch]);

    /// Emit per-piece grades from the current state.
    fn grade(&self, corpus_size: u64) -> Vec<GraderResult>;
}

/// The default grader line-up: BM25 plus a log-weighted sum over the
/// standard stemmer channels.
pub fn default_graders() -> Vec<Box<dyn Grader>> {
    let weights: HashMap<String, f64> = [
        ("By Pitch", 2.0),
        ("By Simple Pitch", 1.0),
        ("By Interval", 0.2),
        ("By Contour", 0.1),
        ("By Rythm", 0.1),
        ("By Normal Rythm", 0.1),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect();
    vec![
        Box::new(Bm25Grader::new()),
        Box::new(LogWeightedSumGrader::new(weights)),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A match record with only the fields graders look at.
    pub fn matched(stemmer: &str, piece_id: i64, stem_id: i64) -> GraderMatch {
        GraderMatch::new(
            stemmer,
            LookupMatch {
                snippet_id: 1,
                piece_id,
                part_id: 1,
                offset: 0,
                stem_id,
                stemmer: stemmer.to_string(),
            },
        )
    }
}
