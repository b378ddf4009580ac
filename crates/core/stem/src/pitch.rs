//! Pitch-view stemmers.

use firms_model::{GeneralNote, Snippet, split_voices};

use crate::{StemError, Stemmer};

/// Token for one event: spelled pitch with octave, `[..]` for a chord,
/// the literal `rest` for a rest.
fn pitch_token(event: &GeneralNote, with_octave: bool) -> String {
    let spell = |p: &firms_model::Pitch| {
        if with_octave {
            p.name_with_octave()
        } else {
            p.name()
        }
    };
    if event.is_rest() {
        "rest".to_string()
    } else if event.is_chord() {
        let inner: Vec<String> = event.pitches.iter().map(|p| spell(p)).collect();
        format!("[{}]", inner.join(" "))
    } else {
        spell(&event.pitches[0])
    }
}

fn stem_pitches(snippet: &Snippet<'_>, with_octave: bool) -> Result<Vec<String>, StemError> {
    let voices = split_voices(snippet.events())?;
    Ok(voices
        .iter()
        .map(|voice| {
            voice
                .iter()
                .map(|event| pitch_token(event, with_octave))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect())
}

/// Absolute spelled pitches, one token per event (`C4 C4 D4 rest E-4`).
pub struct ByPitch;

impl Stemmer for ByPitch {
    fn name(&self) -> &'static str {
        "By Pitch"
    }

    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError> {
        stem_pitches(snippet, true)
    }
}

/// Pitch classes: as [`ByPitch`] with the octave digit dropped.
pub struct BySimplePitch;

impl Stemmer for BySimplePitch {
    fn name(&self) -> &'static str {
        "By Simple Pitch"
    }

    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError> {
        stem_pitches(snippet, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firms_model::{Pitch, Step, quarter_length};

    fn note(step: Step, alter: i8, octave: i8) -> GeneralNote {
        GeneralNote::note(Pitch::new(step, alter, octave), quarter_length(4, 0))
    }

    #[test]
    fn by_pitch_monophonic() {
        let events = vec![
            note(Step::C, 0, 4),
            note(Step::C, 0, 4),
            note(Step::C, 0, 4),
            note(Step::C, 0, 4),
            note(Step::D, 0, 4),
        ];
        let stems = ByPitch.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["C4 C4 C4 C4 D4"]);
    }

    #[test]
    fn by_simple_pitch_drops_octaves() {
        let events = vec![
            note(Step::C, 0, 4),
            note(Step::C, 0, 3),
            note(Step::F, 1, 4),
            note(Step::B, -1, 2),
            note(Step::D, 0, 4),
        ];
        let stems = BySimplePitch.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["C C F# B- D"]);
    }

    #[test]
    fn rests_are_literal() {
        let events = vec![
            note(Step::C, 0, 4),
            GeneralNote::rest(quarter_length(8, 0)),
            note(Step::D, 0, 4),
        ];
        let stems = ByPitch.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["C4 rest D4"]);
    }

    #[test]
    fn chords_produce_one_stem_per_voice() {
        let events = vec![
            note(Step::C, 0, 4),
            GeneralNote::chord(
                [Pitch::new(Step::C, 0, 4), Pitch::new(Step::E, 0, 4)],
                quarter_length(4, 0),
            ),
            note(Step::C, 0, 4),
        ];
        let stems = ByPitch.stem(&Snippet::new(&events, 0)).unwrap();
        assert_eq!(stems, ["C4 C4 C4", "C4 E4 C4"]);
    }
}
