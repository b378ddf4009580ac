//! Okapi BM25 restricted to `k = 1.2, b = 0`.

use std::collections::{HashMap, HashSet};

use crate::{Grader, GraderMatch, GraderResult};

const K: f64 = 1.2;

/// Robertson inverse document frequency, unsmoothed.
///
/// Degenerate on tiny corpora: zero for a stem unique to one piece of a
/// two-piece corpus, negative once `df` exceeds roughly half the corpus.
fn idf(corpus_size: u64, df: u64) -> f64 {
    ((corpus_size as f64 - df as f64 + 0.5) / (df as f64 + 0.5)).ln()
}

fn saturated_tf(tf: u64) -> f64 {
    let tf = tf as f64;
    tf * (K + 1.0) / (tf + K)
}

/// BM25 over stem term frequencies, with no document-length normalization.
///
/// Term frequency counts every match row, so a stem matching several
/// windows of the query contributes multiplicatively. Document frequency
/// is the number of distinct pieces observed for a stem across all batches
/// of the query — a set, not a per-batch sum, so `df` never exceeds the
/// corpus size no matter how many query windows repeat a stem.
#[derive(Default)]
pub struct Bm25Grader {
    /// piece id → stem id → term frequency.
    tfs: HashMap<i64, HashMap<i64, u64>>,
    /// stem id → distinct pieces seen so far.
    dfs: HashMap<i64, HashSet<i64>>,
}

impl Bm25Grader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Grader for Bm25Grader {
    fn name(&self) -> &'static str {
        "BM25"
    }

    fn reset(&mut self) {
        self.tfs.clear();
        self.dfs.clear();
    }

    fn aggregate(&mut self, matches: &[GraderMatch]) {
        for m in matches {
            let stem = m.lookup.stem_id;
            let piece = m.lookup.piece_id;
            self.dfs.entry(stem).or_default().insert(piece);
            *self
                .tfs
                .entry(piece)
                .or_default()
                .entry(stem)
                .or_insert(0) += 1;
        }
    }

    fn grade(&self, corpus_size: u64) -> Vec<GraderResult> {
        self.tfs
            .iter()
            .map(|(piece_id, stem_tfs)| {
                let grade = stem_tfs
                    .iter()
                    .map(|(stem, tf)| {
                        let df = self.dfs.get(stem).map(|p| p.len() as u64).unwrap_or(0);
                        saturated_tf(*tf) * idf(corpus_size, df)
                    })
                    .sum();
                GraderResult::new(*piece_id, grade)
            })
            .collect()
    }
}
