//! Standard MIDI File reading for FIRMS.
//!
//! Each track becomes one part: note-on/off pairs are matched into notes,
//! simultaneous onsets merge into chords, and gaps between sounding notes
//! become rests. Tick deltas divide by the header's ticks-per-quarter into
//! exact rational quarter lengths; measure numbers follow the first
//! time-signature meta event (default 4/4). MIDI has no repeat structure,
//! so imported parts never carry repeat spans.

use std::collections::HashMap;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use num_traits::ToPrimitive;
use thiserror::Error;

use firms_model::{GeneralNote, Part, Pitch, QuarterLength, Score};

/// Errors that can occur while reading a MIDI file.
#[derive(Debug, Error)]
pub enum MidiError {
    #[error("SMF error: {0}")]
    Smf(String),

    /// SMPTE-timecode files have no musical time base.
    #[error("timecode-based MIDI files are not supported")]
    TimecodeTiming,
}

/// A completed note: `[start, end)` in absolute ticks.
#[derive(Debug, Clone, Copy)]
struct TimedNote {
    start: u64,
    end: u64,
    key: u8,
}

/// Read a Standard MIDI File into a score.
pub fn read_smf(data: &[u8]) -> Result<Score, MidiError> {
    let smf = Smf::parse(data).map_err(|err| MidiError::Smf(err.to_string()))?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as i64,
        Timing::Timecode(..) => return Err(MidiError::TimecodeTiming),
    };

    // The first time signature anywhere in the file drives measure numbers.
    let mut measure_quarters = QuarterLength::from_integer(4);
    'outer: for track in &smf.tracks {
        for event in track {
            if let TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_pow, _, _)) =
                event.kind
            {
                let denominator = 1i64 << den_pow;
                measure_quarters = QuarterLength::new(num as i64 * 4, denominator);
                break 'outer;
            }
        }
    }

    let mut score = Score::new(None);
    for track in &smf.tracks {
        let mut name: Option<String> = None;
        let mut active: HashMap<u8, u64> = HashMap::new();
        let mut notes: Vec<TimedNote> = Vec::new();
        let mut tick: u64 = 0;

        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        active.entry(key.as_int()).or_insert(tick);
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        if let Some(start) = active.remove(&key.as_int()) {
                            if tick > start {
                                notes.push(TimedNote {
                                    start,
                                    end: tick,
                                    key: key.as_int(),
                                });
                            }
                        }
                    }
                    _ => {}
                },
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    let text = String::from_utf8_lossy(bytes).trim().to_string();
                    if !text.is_empty() {
                        name = Some(text);
                    }
                }
                _ => {}
            }
        }

        if notes.is_empty() {
            // Conductor / metadata tracks carry no retrievable content.
            continue;
        }
        score.parts.push(track_to_part(
            name,
            notes,
            ticks_per_quarter,
            measure_quarters,
        ));
    }
    Ok(score)
}

fn track_to_part(
    name: Option<String>,
    mut notes: Vec<TimedNote>,
    ticks_per_quarter: i64,
    measure_quarters: QuarterLength,
) -> Part {
    notes.sort_by_key(|n| (n.start, n.key));

    let to_quarters = |ticks: u64| QuarterLength::new(ticks as i64, ticks_per_quarter);
    let measure_of = |start: u64| -> u32 {
        (to_quarters(start) / measure_quarters)
            .floor()
            .to_integer()
            .to_u32()
            .unwrap_or(0)
    };

    let mut part = Part::new(name);
    let mut cursor: u64 = 0;
    let mut index = 0;
    while index < notes.len() {
        let start = notes[index].start;
        let mut group_end = index;
        while group_end < notes.len() && notes[group_end].start == start {
            group_end += 1;
        }

        if start > cursor {
            part.events.push(
                GeneralNote::rest(to_quarters(start - cursor)).in_measure(measure_of(cursor)),
            );
        }

        let group = &notes[index..group_end];
        // Chord members may be held unevenly; the shortest sounding length
        // is the notated one.
        let end = group.iter().map(|n| n.end).min().unwrap_or(start);
        let ql = to_quarters(end - start);
        let measure = measure_of(start);
        if group.len() == 1 {
            part.events.push(
                GeneralNote::note(Pitch::from_midi(group[0].key as i32), ql).in_measure(measure),
            );
        } else {
            part.events.push(
                GeneralNote::chord(
                    group.iter().map(|n| Pitch::from_midi(n.key as i32)),
                    ql,
                )
                .in_measure(measure),
            );
        }
        cursor = cursor.max(end);
        index = group_end;
    }
    part
}

/// Standard MIDI File format handler.
pub struct MidiFormat;

impl firms_notation::ScoreFormat for MidiFormat {
    fn id(&self) -> &'static str {
        "midi"
    }

    fn name(&self) -> &'static str {
        "Standard MIDI File"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mid", "midi"]
    }

    fn detect(&self, content: &[u8]) -> bool {
        content.starts_with(b"MThd")
    }
}

impl firms_notation::ScoreReader for MidiFormat {
    fn read(&self, data: &[u8]) -> firms_notation::NotationResult<firms_notation::Score> {
        read_smf(data).map_err(firms_notation::NotationError::parse)
    }
}
