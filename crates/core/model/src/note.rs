//! General notes: the events a part is made of.

use smallvec::{SmallVec, smallvec};

use crate::duration::QuarterLength;
use crate::pitch::Pitch;

/// What kind of event a [`GeneralNote`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Note,
    Chord,
    Rest,
}

/// A single event in a part: one note, a chord, or a rest.
///
/// Invariants: a `Note` carries exactly one pitch and a `Rest` none. A
/// `Chord` should carry at least one pitch; a zero-pitch chord is
/// constructible (readers may produce one from malformed input) and is
/// rejected by the voice splitter.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralNote {
    pub kind: NoteKind,
    pub pitches: SmallVec<[Pitch; 2]>,
    pub quarter_length: QuarterLength,
    /// 0-based measure index within the containing part.
    pub measure: u32,
}

impl GeneralNote {
    pub fn note(pitch: Pitch, quarter_length: QuarterLength) -> Self {
        Self {
            kind: NoteKind::Note,
            pitches: smallvec![pitch],
            quarter_length,
            measure: 0,
        }
    }

    pub fn chord(pitches: impl IntoIterator<Item = Pitch>, quarter_length: QuarterLength) -> Self {
        Self {
            kind: NoteKind::Chord,
            pitches: pitches.into_iter().collect(),
            quarter_length,
            measure: 0,
        }
    }

    pub fn rest(quarter_length: QuarterLength) -> Self {
        Self {
            kind: NoteKind::Rest,
            pitches: SmallVec::new(),
            quarter_length,
            measure: 0,
        }
    }

    /// Builder-style measure assignment, used by format readers.
    pub fn in_measure(mut self, measure: u32) -> Self {
        self.measure = measure;
        self
    }

    pub fn is_note(&self) -> bool {
        self.kind == NoteKind::Note
    }

    pub fn is_chord(&self) -> bool {
        self.kind == NoteKind::Chord
    }

    pub fn is_rest(&self) -> bool {
        self.kind == NoteKind::Rest
    }

    pub fn pitch_count(&self) -> usize {
        self.pitches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::Step;
    use num_rational::Rational64;

    fn c4() -> Pitch {
        Pitch::new(Step::C, 0, 4)
    }

    #[test]
    fn kinds_and_counts() {
        let n = GeneralNote::note(c4(), Rational64::new(1, 1));
        assert!(n.is_note());
        assert_eq!(n.pitch_count(), 1);

        let ch = GeneralNote::chord([c4(), Pitch::new(Step::E, 0, 4)], Rational64::new(1, 1));
        assert!(ch.is_chord());
        assert_eq!(ch.pitch_count(), 2);

        let r = GeneralNote::rest(Rational64::new(1, 2));
        assert!(r.is_rest());
        assert_eq!(r.pitch_count(), 0);
    }

    #[test]
    fn measure_builder() {
        let n = GeneralNote::note(c4(), Rational64::new(1, 1)).in_measure(7);
        assert_eq!(n.measure, 7);
    }
}
