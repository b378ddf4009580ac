//! Interval- and contour-view stemmers.
//!
//! Both are windows of two over each voice, so their stems have `W − 1`
//! tokens and are invariant under transposition.

use firms_model::{GeneralNote, Snippet, cents_between, split_voices};

use crate::{StemError, Stemmer};

/// Signed cents between consecutive notes; `rest` when either side rests.
pub struct ByInterval;

impl Stemmer for ByInterval {
    fn name(&self) -> &'static str {
        "By Interval"
    }

    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError> {
        let voices = split_voices(snippet.events())?;
        Ok(voices
            .iter()
            .map(|voice| {
                voice
                    .windows(2)
                    .map(|pair| interval_token(&pair[0], &pair[1]))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }
}

fn interval_token(prior: &GeneralNote, next: &GeneralNote) -> String {
    if prior.is_rest() || next.is_rest() {
        "rest".to_string()
    } else {
        cents_between(&prior.pitches[0], &next.pitches[0]).to_string()
    }
}

/// Three-valued up/down/same derivative of the pitch sequence.
pub struct ByContour;

impl Stemmer for ByContour {
    fn name(&self) -> &'static str {
        "By Contour"
    }

    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError> {
        let voices = split_voices(snippet.events())?;
        Ok(voices
            .iter()
            .map(|voice| {
                voice
                    .windows(2)
                    .map(|pair| contour_token(&pair[0], &pair[1]))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }
}

fn contour_token(prior: &GeneralNote, next: &GeneralNote) -> &'static str {
    match (prior.is_rest(), next.is_rest()) {
        (true, true) => "s",
        (true, false) => "u",
        (false, true) => "d",
        (false, false) => {
            let a = prior.pitches[0].midi();
            let b = next.pitches[0].midi();
            if b > a {
                "u"
            } else if b < a {
                "d"
            } else {
                "s"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firms_model::{Pitch, Step, quarter_length};

    fn note(step: Step, octave: i8) -> GeneralNote {
        GeneralNote::note(Pitch::new(step, 0, octave), quarter_length(4, 0))
    }

    fn rest() -> GeneralNote {
        GeneralNote::rest(quarter_length(4, 0))
    }

    fn five_note_line() -> Vec<GeneralNote> {
        vec![
            note(Step::C, 4),
            note(Step::C, 4),
            note(Step::C, 4),
            note(Step::C, 4),
            note(Step::D, 4),
        ]
    }

    #[test]
    fn contour_has_window_minus_one_tokens() {
        let events = five_note_line();
        let stems = ByContour.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["s s s u"]);
    }

    #[test]
    fn interval_in_signed_cents() {
        let events = vec![note(Step::C, 4), note(Step::E, 4), note(Step::C, 4)];
        let stems = ByInterval.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["400 -400"]);
    }

    #[test]
    fn rests_interrupt_intervals() {
        let events = vec![note(Step::C, 4), rest(), note(Step::E, 4)];
        let stems = ByInterval.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["rest rest"]);
    }

    #[test]
    fn contour_around_rests() {
        let events = vec![note(Step::C, 4), rest(), rest(), note(Step::E, 4)];
        let stems = ByContour.stem(&Snippet::new(&events, 0)).unwrap();
        // note→rest = d, rest→rest = s, rest→note = u
        assert_eq!(stems, ["d s u"]);
    }

    #[test]
    fn both_are_transposition_invariant() {
        let original = five_note_line();
        let transposed: Vec<GeneralNote> = original
            .iter()
            .map(|e| {
                GeneralNote::note(e.pitches[0].transpose(4), e.quarter_length)
            })
            .collect();

        for stemmer in [&ByInterval as &dyn Stemmer, &ByContour] {
            let a = stemmer.stem(&Snippet::new(&original, 0)).unwrap();
            let b = stemmer.stem(&Snippet::new(&transposed, 0)).unwrap();
            assert_eq!(a, b, "{}", stemmer.name());
        }
    }
}
