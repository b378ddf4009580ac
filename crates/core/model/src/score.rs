//! Pieces and parts.
//!
//! A score is flattened at parse time: each part is an ordered sequence of
//! [`GeneralNote`]s in performance order, tagged with 0-based measure
//! indices. Repeat structure is kept separately as [`RepeatSpan`]s so the
//! notated order stays lossless; expansion is an explicit, best-effort
//! operation.

use thiserror::Error;

use crate::note::GeneralNote;

/// A repeated span of measures, as notated (repeat barlines).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatSpan {
    /// First measure of the repeated span (0-based, inclusive).
    pub start_measure: u32,
    /// Last measure of the repeated span (0-based, inclusive).
    pub end_measure: u32,
    /// Total number of playthroughs (a plain repeat barline means 2).
    pub times: u32,
}

/// Why a part's repeat structure could not be expanded.
#[derive(Debug, Error)]
pub enum RepeatError {
    #[error("repeat span {start_measure}..={end_measure} is inverted")]
    Inverted { start_measure: u32, end_measure: u32 },

    #[error("repeat spans overlap at measure {measure}")]
    Overlapping { measure: u32 },

    #[error("repeat span ends at measure {end_measure} but the part has {measures} measures")]
    OutOfRange { end_measure: u32, measures: u32 },
}

/// One part of a piece.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Part {
    /// Part name as notated; `None` when the source leaves it blank.
    pub name: Option<String>,
    pub events: Vec<GeneralNote>,
    pub repeats: Vec<RepeatSpan>,
}

impl Part {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// The notated name, or the synthetic `Part {k}` for unnamed parts.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Part {index}"),
        }
    }

    /// Number of measures, derived from the highest event measure index.
    pub fn measure_count(&self) -> u32 {
        self.events
            .iter()
            .map(|e| e.measure + 1)
            .max()
            .unwrap_or(0)
    }

    /// Clone the events of the contiguous measure span `first..=last`.
    pub fn measure_range(&self, first: u32, last: u32) -> Vec<GeneralNote> {
        self.events
            .iter()
            .filter(|e| e.measure >= first && e.measure <= last)
            .cloned()
            .collect()
    }

    /// Unroll the part's repeat spans into played order.
    ///
    /// Returns the event list with measures renumbered in emission order.
    /// Nested or overlapping spans are not expanded; callers are expected to
    /// fall back to the notated order on error.
    pub fn expand_repeats(&self) -> Result<Vec<GeneralNote>, RepeatError> {
        if self.repeats.is_empty() {
            return Ok(self.events.clone());
        }
        let measures = self.measure_count();
        let mut spans = self.repeats.clone();
        spans.sort_by_key(|s| s.start_measure);
        for span in &spans {
            if span.start_measure > span.end_measure {
                return Err(RepeatError::Inverted {
                    start_measure: span.start_measure,
                    end_measure: span.end_measure,
                });
            }
            if span.end_measure >= measures {
                return Err(RepeatError::OutOfRange {
                    end_measure: span.end_measure,
                    measures,
                });
            }
        }
        for pair in spans.windows(2) {
            if pair[1].start_measure <= pair[0].end_measure {
                return Err(RepeatError::Overlapping {
                    measure: pair[1].start_measure,
                });
            }
        }

        // Emit measure indices in played order, then renumber sequentially.
        let mut played: Vec<u32> = Vec::new();
        let mut cursor = 0u32;
        for span in &spans {
            played.extend(cursor..span.start_measure);
            for _ in 0..span.times.max(1) {
                played.extend(span.start_measure..=span.end_measure);
            }
            cursor = span.end_measure + 1;
        }
        played.extend(cursor..measures);

        let mut out = Vec::with_capacity(self.events.len());
        for (new_index, source_measure) in played.iter().enumerate() {
            for event in self.events.iter().filter(|e| e.measure == *source_measure) {
                out.push(event.clone().in_measure(new_index as u32));
            }
        }
        Ok(out)
    }
}

/// A parsed piece: an ordered list of parts plus the notated title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub title: Option<String>,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            parts: Vec::new(),
        }
    }

    /// The notated title, or `Untitled` when absent or blank.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => "Untitled".to_string(),
        }
    }

    /// All events of all parts, concatenated in part order.
    ///
    /// Queries are treated as a single synthetic line; this is the line.
    pub fn flattened_events(&self) -> Vec<GeneralNote> {
        self.parts
            .iter()
            .flat_map(|p| p.events.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::quarter_length;
    use crate::pitch::{Pitch, Step};

    fn note(step: Step, measure: u32) -> GeneralNote {
        GeneralNote::note(Pitch::new(step, 0, 4), quarter_length(4, 0)).in_measure(measure)
    }

    fn part_with_measures() -> Part {
        Part {
            name: None,
            events: vec![
                note(Step::C, 0),
                note(Step::D, 1),
                note(Step::E, 2),
                note(Step::F, 3),
            ],
            repeats: vec![],
        }
    }

    #[test]
    fn display_names_default() {
        let part = Part::new(None);
        assert_eq!(part.display_name(2), "Part 2");
        let named = Part::new(Some("Soprano".into()));
        assert_eq!(named.display_name(0), "Soprano");

        assert_eq!(Score::new(None).display_title(), "Untitled");
        assert_eq!(Score::new(Some(String::new())).display_title(), "Untitled");
    }

    #[test]
    fn measure_range_is_inclusive() {
        let part = part_with_measures();
        let slice = part.measure_range(1, 2);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].measure, 1);
        assert_eq!(slice[1].measure, 2);
    }

    #[test]
    fn expand_without_repeats_is_identity() {
        let part = part_with_measures();
        assert_eq!(part.expand_repeats().unwrap(), part.events);
    }

    #[test]
    fn expand_unrolls_a_span() {
        let mut part = part_with_measures();
        part.repeats.push(RepeatSpan {
            start_measure: 1,
            end_measure: 2,
            times: 2,
        });
        let expanded = part.expand_repeats().unwrap();
        // C | D E | D E | F, renumbered 0..5
        let names: Vec<String> = expanded
            .iter()
            .map(|e| e.pitches[0].name_with_octave())
            .collect();
        assert_eq!(names, ["C4", "D4", "E4", "D4", "E4", "F4"]);
        let measures: Vec<u32> = expanded.iter().map(|e| e.measure).collect();
        assert_eq!(measures, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn expand_rejects_overlap() {
        let mut part = part_with_measures();
        part.repeats.push(RepeatSpan {
            start_measure: 0,
            end_measure: 2,
            times: 2,
        });
        part.repeats.push(RepeatSpan {
            start_measure: 2,
            end_measure: 3,
            times: 2,
        });
        assert!(matches!(
            part.expand_repeats(),
            Err(RepeatError::Overlapping { measure: 2 })
        ));
    }

    #[test]
    fn expand_rejects_out_of_range() {
        let mut part = part_with_measures();
        part.repeats.push(RepeatSpan {
            start_measure: 2,
            end_measure: 9,
            times: 2,
        });
        assert!(matches!(
            part.expand_repeats(),
            Err(RepeatError::OutOfRange { .. })
        ));
    }

    #[test]
    fn flattened_events_concatenates_parts() {
        let mut score = Score::new(Some("Two lines".into()));
        score.parts.push(Part {
            name: None,
            events: vec![note(Step::C, 0)],
            repeats: vec![],
        });
        score.parts.push(Part {
            name: None,
            events: vec![note(Step::G, 0)],
            repeats: vec![],
        });
        let flat = score.flattened_events();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].pitches[0].name_with_octave(), "G4");
    }
}
