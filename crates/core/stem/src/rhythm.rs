//! Rhythm-view stemmers.

use num_traits::ToPrimitive;

use firms_model::{QuarterLength, Snippet, split_voices};

use crate::{StemError, Stemmer};

/// Exact rational quarter length per position (`1 1 3/2 1/2 1`).
pub struct ByRythm;

impl Stemmer for ByRythm {
    fn name(&self) -> &'static str {
        "By Rythm"
    }

    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError> {
        let voices = split_voices(snippet.events())?;
        Ok(voices
            .iter()
            .map(|voice| {
                voice
                    .iter()
                    .map(|event| event.quarter_length.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }
}

/// Quarter lengths divided by the window's maximum quarter length,
/// rendered as shortest-roundtrip decimals (`1.0 0.5 …`). A window whose
/// maximum is zero divides by 1 instead.
pub struct ByNormalRythm;

impl Stemmer for ByNormalRythm {
    fn name(&self) -> &'static str {
        "By Normal Rythm"
    }

    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError> {
        let voices = split_voices(snippet.events())?;
        Ok(voices
            .iter()
            .map(|voice| {
                let max = voice
                    .iter()
                    .map(|event| event.quarter_length)
                    .max()
                    .filter(|max| *max != QuarterLength::from_integer(0))
                    .unwrap_or_else(|| QuarterLength::from_integer(1));
                voice
                    .iter()
                    .map(|event| {
                        let normalized = event.quarter_length / max;
                        format!("{:?}", normalized.to_f64().unwrap_or(0.0))
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firms_model::{GeneralNote, Pitch, Step, quarter_length};

    fn note(base: u32, dots: u8) -> GeneralNote {
        GeneralNote::note(Pitch::new(Step::C, 0, 4), quarter_length(base, dots))
    }

    #[test]
    fn rhythm_renders_exact_rationals() {
        let events = vec![note(4, 0), note(4, 1), note(8, 0), note(2, 0)];
        let stems = ByRythm.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["1 3/2 1/2 2"]);
    }

    #[test]
    fn rhythm_includes_rests() {
        let events = vec![note(4, 0), GeneralNote::rest(quarter_length(8, 0))];
        let stems = ByRythm.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["1 1/2"]);
    }

    #[test]
    fn uniform_window_normalizes_to_ones() {
        let events = vec![note(4, 0); 5];
        let stems = ByNormalRythm.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["1.0 1.0 1.0 1.0 1.0"]);
    }

    #[test]
    fn normalization_divides_by_window_maximum() {
        let events = vec![note(2, 0), note(4, 0), note(8, 0)];
        let stems = ByNormalRythm.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["1.0 0.5 0.25"]);
    }

    #[test]
    fn triplet_member_is_exact_in_rhythm_stem() {
        let triplet = quarter_length(8, 0) * QuarterLength::new(2, 3);
        let events = vec![GeneralNote::note(
            Pitch::new(Step::C, 0, 4),
            triplet,
        )];
        let stems = ByRythm.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["1/3"]);
    }
}
