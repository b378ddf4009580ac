//! Voice-leading splitter.
//!
//! Turns a possibly polyphonic event stream into `V` monophonic lines,
//! where `V` is the widest chord in the stream. Voices are led by nearest
//! interval: starting from the first maximal chord (the *peak*), neighbours
//! are assigned outward in both directions, each interior voice following
//! the pitch that moves the least in cents. Rests are replicated into every
//! line at their original positions, so every produced voice has exactly
//! the input length.

use thiserror::Error;

use crate::note::GeneralNote;
use crate::pitch::{Pitch, cents_between};

/// Why a stream could not be split into voices.
#[derive(Debug, Error)]
pub enum SplitError {
    /// A chord with no pitches cannot be voiced.
    #[error("empty chord at position {position}")]
    EmptyChord { position: usize },
}

/// Split `events` into monophonic voices.
///
/// A stream of rests and single notes is returned unchanged as one voice.
pub fn split_voices(events: &[GeneralNote]) -> Result<Vec<Vec<GeneralNote>>, SplitError> {
    for (position, event) in events.iter().enumerate() {
        if event.is_chord() && event.pitches.is_empty() {
            return Err(SplitError::EmptyChord { position });
        }
    }

    let width = events
        .iter()
        .filter(|e| !e.is_rest())
        .map(|e| e.pitch_count())
        .max()
        .unwrap_or(0);
    if width <= 1 {
        return Ok(vec![events.to_vec()]);
    }

    let voiced: Vec<(usize, &GeneralNote)> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_rest())
        .collect();
    let peak = match voiced.iter().position(|(_, e)| e.pitch_count() == width) {
        Some(peak) => peak,
        None => unreachable!("width > 1 implies a maximal chord exists"),
    };
    let peak_split: Vec<Pitch> = voiced[peak].1.pitches.to_vec();

    // Walk away from the peak in both directions, each element voiced
    // against the already-voiced neighbour nearer the peak.
    let mut climb: Vec<(usize, Vec<Pitch>)> = Vec::with_capacity(peak);
    let mut lead = peak_split.clone();
    for &(source, event) in voiced[..peak].iter().rev() {
        let split = assign_against(&lead, event, width);
        climb.push((source, split.clone()));
        lead = split;
    }
    climb.reverse();

    let mut fall: Vec<(usize, Vec<Pitch>)> = Vec::with_capacity(voiced.len() - peak - 1);
    let mut lead = peak_split.clone();
    for &(source, event) in &voiced[peak + 1..] {
        let split = assign_against(&lead, event, width);
        fall.push((source, split.clone()));
        lead = split;
    }

    let mut voices: Vec<Vec<(usize, GeneralNote)>> = vec![Vec::new(); width];
    let peak_entry = (voiced[peak].0, peak_split);
    for (source, split) in climb
        .iter()
        .chain(std::iter::once(&peak_entry))
        .chain(fall.iter())
    {
        let template = &events[*source];
        for (voice, pitch) in split.iter().enumerate() {
            voices[voice].push((
                *source,
                GeneralNote::note(*pitch, template.quarter_length).in_measure(template.measure),
            ));
        }
    }

    for (source, event) in events.iter().enumerate() {
        if event.is_rest() {
            for voice in voices.iter_mut() {
                voice.push((source, event.clone()));
            }
        }
    }
    for voice in voices.iter_mut() {
        voice.sort_by_key(|(source, _)| *source);
    }

    Ok(voices
        .into_iter()
        .map(|voice| voice.into_iter().map(|(_, event)| event).collect())
        .collect())
}

/// Voice one event against its already-voiced neighbour.
///
/// `lead` always has `width` pitches. A single note is replicated into
/// every voice; an equally wide chord keeps its pitches in order; anything
/// else keeps its outer pitches and follows `lead`'s interior pitches by
/// nearest cents.
fn assign_against(lead: &[Pitch], current: &GeneralNote, width: usize) -> Vec<Pitch> {
    let pitches = &current.pitches;
    if pitches.len() == 1 {
        return vec![pitches[0]; width];
    }
    if pitches.len() == lead.len() {
        return pitches.to_vec();
    }

    let mut out = Vec::with_capacity(width);
    out.push(pitches[0]);
    for interior in &lead[1..lead.len() - 1] {
        let nearest = pitches
            .iter()
            .copied()
            .min_by_key(|p| cents_between(interior, p).abs())
            .unwrap();
        out.push(nearest);
    }
    out.push(pitches[pitches.len() - 1]);
    out
}
