//! Log-weighted sum over stemmer channels.

use std::collections::HashMap;

use crate::{Grader, GraderMatch, GraderResult};

/// Weighted sum of per-channel log match counts.
///
/// Weights are injected at construction and may be negative. A piece only
/// accumulates a channel key once it has at least one match there, so
/// `ln(0)` is never evaluated; channels without a configured weight are
/// skipped.
pub struct LogWeightedSumGrader {
    weights: HashMap<String, f64>,
    /// piece id → stemmer name → match count.
    counts: HashMap<i64, HashMap<String, u64>>,
}

impl LogWeightedSumGrader {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self {
            weights,
            counts: HashMap::new(),
        }
    }
}

impl Grader for LogWeightedSumGrader {
    fn name(&self) -> &'static str {
        "Log Weighted Sum"
    }

    fn reset(&mut self) {
        self.counts.clear();
    }

    fn aggregate(&mut self, matches: &[GraderMatch]) {
        for m in matches {
            *self
                .counts
                .entry(m.lookup.piece_id)
                .or_default()
                .entry(m.stemmer.clone())
                .or_insert(0) += 1;
        }
    }

    fn grade(&self, _corpus_size: u64) -> Vec<GraderResult> {
        self.counts
            .iter()
            .map(|(piece_id, channels)| {
                let grade = channels
                    .iter()
                    .filter_map(|(stemmer, count)| {
                        self.weights
                            .get(stemmer)
                            .map(|weight| weight * (*count as f64).ln())
                    })
                    .sum();
                GraderResult::new(*piece_id, grade)
            })
            .collect()
    }
}
