//! Fixed-window snippet extraction.
//!
//! A snippet is a shallow view of `W` consecutive events of one voice of
//! one part. The extractor slides the window one event at a time and never
//! copies note data; for a line of length `L` it yields exactly
//! `max(0, L − W + 1)` snippets.

use crate::note::GeneralNote;

/// Default snippet window, in notes-and-rests.
pub const DEFAULT_WINDOW: usize = 5;

/// A window of events at a known offset within its line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snippet<'a> {
    events: &'a [GeneralNote],
    offset: usize,
}

impl<'a> Snippet<'a> {
    pub fn new(events: &'a [GeneralNote], offset: usize) -> Self {
        Self { events, offset }
    }

    pub fn events(&self) -> &'a [GeneralNote] {
        self.events
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// One-line description for logs and the `show` surface.
    pub fn describe(&self) -> String {
        let tokens: Vec<String> = self
            .events
            .iter()
            .map(|event| {
                if event.is_rest() {
                    "rest".to_string()
                } else if event.is_chord() {
                    let inner: Vec<String> = event
                        .pitches
                        .iter()
                        .map(|p| p.name_with_octave())
                        .collect();
                    format!("[{}]", inner.join(" "))
                } else {
                    event.pitches[0].name_with_octave()
                }
            })
            .collect();
        tokens.join(" ")
    }
}

/// Slide a window of `window` events across `events`.
pub fn snippets(events: &[GeneralNote], window: usize) -> impl Iterator<Item = Snippet<'_>> {
    let window = window.max(1);
    events
        .windows(window)
        .enumerate()
        .map(|(offset, events)| Snippet::new(events, offset))
}
