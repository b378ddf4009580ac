//! In-memory score model for FIRMS.
//!
//! This crate is the leaf of the workspace: a lossless flat representation of
//! a parsed score, plus the two transformations every other component builds
//! on:
//!
//! - `pitch` — spelled pitches with exact semitone arithmetic
//! - `duration` — exact rational quarter lengths
//! - `note` — general notes (single note, chord, or rest)
//! - `score` — parts, pieces, and best-effort repeat expansion
//! - `voices` — nearest-interval voice-leading splitter
//! - `snippet` — fixed-window snippet extraction
//!
//! Format readers produce [`Score`] values; the stemming pipeline consumes
//! [`Snippet`] views of them.

pub mod duration;
pub mod note;
pub mod pitch;
pub mod score;
pub mod snippet;
pub mod voices;

pub use duration::{QuarterLength, quarter_length};
pub use note::{GeneralNote, NoteKind};
pub use pitch::{Pitch, Step, cents_between};
pub use score::{Part, RepeatError, RepeatSpan, Score};
pub use snippet::{DEFAULT_WINDOW, Snippet, snippets};
pub use voices::{SplitError, split_voices};
