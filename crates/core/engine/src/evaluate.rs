//! Evaluation harness.
//!
//! Samples indexed pieces, re-reads each from its origin path, cuts a
//! random contiguous measure range, optionally injects one synthetic
//! transcription error, queries the index with the fragment, and records
//! the rank of the true piece under every grader. Mean and variance of the
//! ranks are the evaluation metric.

use std::path::Path;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use firms_model::{GeneralNote, Part, Pitch, Score};
use firms_store::IndexStore;

use crate::{Engine, EngineError, EngineResult, QueryInput};

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Number of samples to draw (with replacement).
    pub n: usize,
    /// RNG seed for reproducible runs.
    pub seed: Option<u64>,
    /// Probability that a sample receives one synthetic error.
    pub error_rate: f64,
    /// Bounds on the sampled measure-range length, inclusive.
    pub min_measures: u32,
    pub max_measures: u32,
    /// Relative weights of the four error kinds.
    pub add_note_weight: f64,
    pub remove_note_weight: f64,
    pub replace_note_weight: f64,
    pub transposition_weight: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            n: 10,
            seed: None,
            error_rate: 0.0,
            min_measures: 3,
            max_measures: 7,
            add_note_weight: 1.0,
            remove_note_weight: 1.0,
            replace_note_weight: 1.0,
            transposition_weight: 1.0,
        }
    }
}

/// The synthetic error applied to a sample, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mutation {
    AddNote,
    RemoveNote,
    ReplaceNote,
    /// Whole-fragment transposition by this many semitones.
    Transpose(i32),
}

/// One evaluated sample.
#[derive(Debug, Clone, Serialize)]
pub struct EvalOutcome {
    pub piece_id: i64,
    pub piece_name: String,
    pub mutation: Option<Mutation>,
    /// 0-based rank of the true piece per grader; `None` when unranked.
    pub ranks: IndexMap<String, Option<usize>>,
}

/// Rank statistics for one grader.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RankSummary {
    pub mean: f64,
    pub variance: f64,
    /// Samples in which the true piece appeared at all.
    pub ranked: usize,
    pub total: usize,
}

/// Full harness output.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub outcomes: Vec<EvalOutcome>,
    pub summary: IndexMap<String, RankSummary>,
}

/// Run the harness against an engine whose store is already populated.
pub fn run<S: IndexStore>(
    engine: &mut Engine<S>,
    config: &EvalConfig,
) -> EngineResult<EvalReport> {
    let pieces = engine.store().pieces()?;
    if pieces.is_empty() {
        return Err(EngineError::EmptyCorpus);
    }
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut outcomes = Vec::with_capacity(config.n);
    for _ in 0..config.n {
        let piece = match pieces.choose(&mut rng) {
            Some(piece) => piece.clone(),
            None => unreachable!("pieces is non-empty"),
        };
        let score = match engine.notation().read_path(Path::new(&piece.path)) {
            Ok(score) => score,
            Err(err) => {
                tracing::warn!(path = %piece.path, %err, "sample unreadable, skipping");
                continue;
            }
        };
        let Some(mut fragment) = sample_fragment(&score, config, &mut rng) else {
            tracing::warn!(path = %piece.path, "piece has no usable part, skipping");
            continue;
        };

        let mutation = if config.error_rate > 0.0 && rng.gen_bool(config.error_rate.min(1.0)) {
            apply_mutation(&mut fragment, config, &mut rng)
        } else {
            None
        };

        let mut query_part = Part::new(None);
        query_part.events = fragment;
        let mut query = Score::new(None);
        query.parts.push(query_part);

        let grades = engine.query(QueryInput::Score(query))?;
        let mut ranks = IndexMap::new();
        for (grader, results) in grades {
            let mut ordered = results;
            ordered.sort_by(|a, b| {
                b.grade
                    .partial_cmp(&a.grade)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let rank = ordered.iter().position(|r| r.piece_id == piece.id);
            ranks.insert(grader, rank);
        }
        outcomes.push(EvalOutcome {
            piece_id: piece.id,
            piece_name: piece.name,
            mutation,
            ranks,
        });
    }

    let summary = summarize(&outcomes);
    Ok(EvalReport { outcomes, summary })
}

/// Cut a random contiguous measure range out of a random non-empty part.
fn sample_fragment(
    score: &Score,
    config: &EvalConfig,
    rng: &mut StdRng,
) -> Option<Vec<GeneralNote>> {
    let candidates: Vec<&Part> = score.parts.iter().filter(|p| !p.events.is_empty()).collect();
    let part = candidates.choose(rng)?;

    let measures = part.measure_count();
    let min = config.min_measures.max(1);
    let max = config.max_measures.max(min);
    let length = rng.gen_range(min..=max);
    let start = if measures > length {
        rng.gen_range(0..=measures - length)
    } else {
        0
    };
    let events = part.measure_range(start, start + length - 1);
    if events.is_empty() {
        // Degenerate measure numbering; fall back to the whole part.
        return Some(part.events.clone());
    }
    Some(events)
}

fn apply_mutation(
    events: &mut Vec<GeneralNote>,
    config: &EvalConfig,
    rng: &mut StdRng,
) -> Option<Mutation> {
    let weights = [
        (Mutation::AddNote, config.add_note_weight),
        (Mutation::RemoveNote, config.remove_note_weight),
        (Mutation::ReplaceNote, config.replace_note_weight),
        (Mutation::Transpose(0), config.transposition_weight),
    ];
    let total: f64 = weights.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    let mut chosen = weights[0].0;
    for (mutation, weight) in weights {
        let weight = weight.max(0.0);
        if roll < weight {
            chosen = mutation;
            break;
        }
        roll -= weight;
    }

    match chosen {
        Mutation::AddNote => {
            let position = rng.gen_range(0..=events.len());
            events.insert(position, random_note(events, rng));
            Some(Mutation::AddNote)
        }
        Mutation::RemoveNote => {
            if events.is_empty() {
                return None;
            }
            let position = rng.gen_range(0..events.len());
            events.remove(position);
            Some(Mutation::RemoveNote)
        }
        Mutation::ReplaceNote => {
            if events.is_empty() {
                return None;
            }
            let position = rng.gen_range(0..events.len());
            events[position] = random_note(events, rng);
            Some(Mutation::ReplaceNote)
        }
        Mutation::Transpose(_) => {
            // Uniform in [-5, 5] excluding 0.
            let mut semitones = 0;
            while semitones == 0 {
                semitones = rng.gen_range(-5..=5);
            }
            for event in events.iter_mut() {
                for pitch in event.pitches.iter_mut() {
                    *pitch = pitch.transpose(semitones);
                }
            }
            Some(Mutation::Transpose(semitones))
        }
    }
}

/// A plausible interloper: a random pitch in the fragment's register with
/// the duration of an existing event.
fn random_note(events: &[GeneralNote], rng: &mut StdRng) -> GeneralNote {
    let ql = events
        .choose(rng)
        .map(|e| e.quarter_length)
        .unwrap_or_else(|| firms_model::quarter_length(4, 0));
    let midi = rng.gen_range(48..=84);
    GeneralNote::note(Pitch::from_midi(midi), ql)
}

fn summarize(outcomes: &[EvalOutcome]) -> IndexMap<String, RankSummary> {
    let mut per_grader: IndexMap<String, Vec<Option<usize>>> = IndexMap::new();
    for outcome in outcomes {
        for (grader, rank) in &outcome.ranks {
            per_grader.entry(grader.clone()).or_default().push(*rank);
        }
    }
    per_grader
        .into_iter()
        .map(|(grader, ranks)| {
            let total = ranks.len();
            let found: Vec<f64> = ranks.iter().flatten().map(|r| *r as f64).collect();
            let ranked = found.len();
            let mean = if ranked > 0 {
                found.iter().sum::<f64>() / ranked as f64
            } else {
                0.0
            };
            let variance = if ranked > 0 {
                found.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ranked as f64
            } else {
                0.0
            };
            (
                grader,
                RankSummary {
                    mean,
                    variance,
                    ranked,
                    total,
                },
            )
        })
        .collect()
}
