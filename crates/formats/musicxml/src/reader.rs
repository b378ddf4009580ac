//! Event-driven reader for partwise MusicXML.
//!
//! Only the retrieval-relevant subset is read: part names, pitches, rests,
//! chords, durations, and repeat barlines. Durations are exact rationals
//! (`duration / divisions` quarter notes). Grace notes carry no duration
//! and are skipped. `<backup>`/`<forward>` voice plumbing is ignored; notes
//! are taken in document order.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use firms_model::{GeneralNote, NoteKind, Part, Pitch, QuarterLength, RepeatSpan, Score, Step};

use crate::error::MusicXmlError;

/// Read a partwise MusicXML document into a score.
pub fn read_score(xml: &str) -> Result<Score, MusicXmlError> {
    let mut reader = Reader::from_str(xml);
    let mut state = ReaderState::default();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                state.on_start(&name, &e)?;
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                state.on_start(&name, &e)?;
                state.on_end(&name);
            }
            Event::Text(t) => {
                let text = String::from_utf8_lossy(t.as_ref());
                let text = text.trim();
                if !text.is_empty() {
                    state.on_text(&stack, text)?;
                }
            }
            Event::End(_) => {
                if let Some(name) = stack.pop() {
                    state.on_end(&name);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    state.finish()
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, MusicXmlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MusicXmlError::Xml(err.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8_lossy(&attr.value).into_owned()));
        }
    }
    Ok(None)
}

/// Pitch fields of the note currently being read.
#[derive(Default)]
struct NoteState {
    step: Option<Step>,
    alter: i8,
    octave: Option<i8>,
    duration: Option<i64>,
    is_rest: bool,
    is_chord: bool,
    is_grace: bool,
}

#[derive(Default)]
struct ReaderState {
    saw_partwise: bool,
    title: Option<String>,
    movement_title: Option<String>,
    /// part-list id → part-name.
    part_names: std::collections::HashMap<String, String>,
    current_score_part: Option<String>,
    parts: Vec<Part>,
    current_part: Option<Part>,
    /// Quarter-note divisions, sticky once declared.
    divisions: Option<i64>,
    measure: u32,
    measures_seen: u32,
    pending_repeat_start: Option<u32>,
    note: Option<NoteState>,
}

impl ReaderState {
    fn on_start(&mut self, name: &str, e: &BytesStart<'_>) -> Result<(), MusicXmlError> {
        match name {
            "score-partwise" => self.saw_partwise = true,
            "score-part" => self.current_score_part = attribute(e, b"id")?,
            "part" => {
                let id = attribute(e, b"id")?;
                let name = id.as_deref().and_then(|id| self.part_names.get(id)).cloned();
                self.current_part = Some(Part::new(name));
                self.measures_seen = 0;
                self.measure = 0;
                self.pending_repeat_start = None;
            }
            "measure" if self.current_part.is_some() => {
                self.measure = self.measures_seen;
                self.measures_seen += 1;
            }
            "note" => self.note = Some(NoteState::default()),
            "rest" => {
                if let Some(note) = self.note.as_mut() {
                    note.is_rest = true;
                }
            }
            "chord" => {
                if let Some(note) = self.note.as_mut() {
                    note.is_chord = true;
                }
            }
            "grace" => {
                if let Some(note) = self.note.as_mut() {
                    note.is_grace = true;
                }
            }
            "repeat" => self.on_repeat(e)?,
            _ => {}
        }
        Ok(())
    }

    fn on_repeat(&mut self, e: &BytesStart<'_>) -> Result<(), MusicXmlError> {
        let direction = attribute(e, b"direction")?.unwrap_or_default();
        match direction.as_str() {
            "forward" => self.pending_repeat_start = Some(self.measure),
            "backward" => {
                let times = match attribute(e, b"times")? {
                    Some(value) => value.parse().map_err(|_| {
                        MusicXmlError::invalid_value(
                            "repeat times",
                            value,
                            format!("measure {}", self.measure),
                        )
                    })?,
                    None => 2,
                };
                let span = RepeatSpan {
                    start_measure: self.pending_repeat_start.take().unwrap_or(0),
                    end_measure: self.measure,
                    times,
                };
                if let Some(part) = self.current_part.as_mut() {
                    part.repeats.push(span);
                }
            }
            other => {
                tracing::debug!(direction = other, "ignoring repeat barline direction");
            }
        }
        Ok(())
    }

    fn on_text(&mut self, stack: &[String], text: &str) -> Result<(), MusicXmlError> {
        let element = match stack.last() {
            Some(element) => element.as_str(),
            None => return Ok(()),
        };
        let parent = stack
            .len()
            .checked_sub(2)
            .map(|i| stack[i].as_str())
            .unwrap_or("");
        let location = || format!("measure {}", self.measure);

        match (parent, element) {
            ("score-part", "part-name") => {
                if let Some(id) = &self.current_score_part {
                    self.part_names.insert(id.clone(), text.to_string());
                }
            }
            ("work", "work-title") => self.title = Some(text.to_string()),
            (_, "movement-title") => self.movement_title = Some(text.to_string()),
            ("attributes", "divisions") => {
                let value: i64 = text.parse().map_err(|_| {
                    MusicXmlError::invalid_value("divisions", text, location())
                })?;
                if value <= 0 {
                    return Err(MusicXmlError::invalid_value("divisions", text, location()));
                }
                self.divisions = Some(value);
            }
            ("pitch", "step") => {
                if let Some(note) = self.note.as_mut() {
                    let step = text
                        .chars()
                        .next()
                        .and_then(Step::from_letter)
                        .ok_or_else(|| {
                            MusicXmlError::invalid_value("pitch step", text, location())
                        })?;
                    note.step = Some(step);
                }
            }
            ("pitch", "alter") => {
                if let Some(note) = self.note.as_mut() {
                    // Microtonal alters are rounded to the nearest semitone.
                    let value: f64 = text.parse().map_err(|_| {
                        MusicXmlError::invalid_value("pitch alter", text, location())
                    })?;
                    note.alter = value.round() as i8;
                }
            }
            ("pitch", "octave") => {
                if let Some(note) = self.note.as_mut() {
                    let value: i8 = text.parse().map_err(|_| {
                        MusicXmlError::invalid_value("pitch octave", text, location())
                    })?;
                    note.octave = Some(value);
                }
            }
            ("note", "duration") => {
                if let Some(note) = self.note.as_mut() {
                    let value: i64 = text.parse().map_err(|_| {
                        MusicXmlError::invalid_value("duration", text, location())
                    })?;
                    note.duration = Some(value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_end(&mut self, name: &str) {
        match name {
            "note" => self.finish_note(),
            "part" => {
                if let Some(part) = self.current_part.take() {
                    self.parts.push(part);
                }
            }
            _ => {}
        }
    }

    fn finish_note(&mut self) {
        let Some(note) = self.note.take() else {
            return;
        };
        let Some(part) = self.current_part.as_mut() else {
            return;
        };
        if note.is_grace {
            return;
        }
        let Some(ticks) = note.duration else {
            tracing::warn!(measure = self.measure, "note without duration, skipping");
            return;
        };
        let divisions = self.divisions.unwrap_or(1);
        let ql = QuarterLength::new(ticks, divisions);

        if note.is_rest {
            part.events
                .push(GeneralNote::rest(ql).in_measure(self.measure));
            return;
        }
        let (Some(step), Some(octave)) = (note.step, note.octave) else {
            tracing::warn!(measure = self.measure, "unpitched note, skipping");
            return;
        };
        let pitch = Pitch::new(step, note.alter, octave);

        if note.is_chord {
            // <chord/> folds this note into the previous event.
            if let Some(prev) = part.events.last_mut() {
                if !prev.is_rest() {
                    prev.kind = NoteKind::Chord;
                    prev.pitches.push(pitch);
                    return;
                }
            }
        }
        part.events
            .push(GeneralNote::note(pitch, ql).in_measure(self.measure));
    }

    fn finish(self) -> Result<Score, MusicXmlError> {
        if !self.saw_partwise {
            return Err(MusicXmlError::NotPartwise);
        }
        let mut score = Score::new(self.title.or(self.movement_title));
        score.parts = self.parts;
        Ok(score)
    }
}
