//! Stemming pipeline for FIRMS.
//!
//! A *stemmer* is a deterministic, side-effect-free function from a snippet
//! to a list of stem strings — one string per monophonic voice produced by
//! the voice splitter. The stem string is the wire format of the index:
//! any two implementations must produce byte-identical stems to share a
//! database, so every token grammar here is fixed.
//!
//! Six stemmers are provided, each capturing one orthogonal view of a
//! snippet:
//!
//! | Stemmer | View |
//! |---|---|
//! | [`ByPitch`] | absolute spelled pitches |
//! | [`BySimplePitch`] | pitch classes (octave dropped) |
//! | [`ByInterval`] | signed cents between consecutive notes |
//! | [`ByContour`] | up/down/same derivative |
//! | [`ByRythm`] | exact rational quarter lengths |
//! | [`ByNormalRythm`] | quarter lengths normalized by the window maximum |

use thiserror::Error;

use firms_model::{Snippet, SplitError};

mod interval;
mod pitch;
mod rhythm;

pub use interval::{ByContour, ByInterval};
pub use pitch::{ByPitch, BySimplePitch};
pub use rhythm::{ByNormalRythm, ByRythm};

// ---------------------------------------------------------------------------
// Trait & error
// ---------------------------------------------------------------------------

/// Why a snippet could not be stemmed.
#[derive(Debug, Error)]
pub enum StemError {
    /// The voice splitter rejected the snippet.
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// A named, deterministic snippet-to-stems function.
///
/// `stem` returns one whitespace-joined token string per voice of the
/// snippet; a polyphonic snippet therefore produces several stems.
pub trait Stemmer: Send + Sync {
    /// Display name; identifies the stemming function in the index.
    fn name(&self) -> &'static str;

    /// Compute the stem strings for `snippet`.
    fn stem(&self, snippet: &Snippet<'_>) -> Result<Vec<String>, StemError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered collection of registered stemmers.
pub struct StemmerRegistry {
    stemmers: Vec<Box<dyn Stemmer>>,
}

impl StemmerRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            stemmers: Vec::new(),
        }
    }

    /// The standard six-stemmer set, in registration order.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ByPitch));
        registry.register(Box::new(BySimplePitch));
        registry.register(Box::new(ByContour));
        registry.register(Box::new(ByInterval));
        registry.register(Box::new(ByRythm));
        registry.register(Box::new(ByNormalRythm));
        registry
    }

    /// Register a stemmer.
    pub fn register(&mut self, stemmer: Box<dyn Stemmer>) {
        self.stemmers.push(stemmer);
    }

    /// Find a stemmer by display name.
    pub fn get(&self, name: &str) -> Option<&dyn Stemmer> {
        self.stemmers
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    /// Iterate over stemmers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Stemmer> {
        self.stemmers.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stemmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stemmers.is_empty()
    }
}

impl Default for StemmerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
