//! Score-reader traits for FIRMS.
//!
//! This crate defines the abstractions every score format implements, and a
//! runtime registry for dispatching on file extension or content:
//!
//! - [`ScoreFormat`] — metadata about a format (id, name, extensions,
//!   content detection)
//! - [`ScoreReader`] — parse raw bytes into the in-memory [`Score`] model
//! - [`NotationError`] — unified error type wrapping format-specific errors
//! - [`NotationRegistry`] — discovery and dispatch over registered readers
//!
//! # Adding a new format
//!
//! 1. Create a new crate under `crates/formats/<name>/`.
//! 2. Define a unit struct (e.g. `pub struct AbcFormat;`).
//! 3. Implement [`ScoreFormat`] with metadata and content detection.
//! 4. Implement [`ScoreReader`].
//! 5. Register the format where the engine is assembled.

use std::path::Path;

use thiserror::Error;

// Re-export the model's score type for convenience.
pub use firms_model::Score;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Unified error type for score reading.
#[derive(Debug, Error)]
pub enum NotationError {
    /// The input could not be parsed as the format's notation.
    #[error("parse error: {0}")]
    Parse(Box<dyn std::error::Error + Send + Sync>),

    /// No registered format matches the given extension or content.
    #[error("unknown score format: {0}")]
    UnknownFormat(String),

    /// An I/O error occurred while reading the input.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NotationError {
    /// Wrap a format-specific parse error.
    pub fn parse(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Result type alias for score reading.
pub type NotationResult<T> = Result<T, NotationError>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Describes a score file format.
pub trait ScoreFormat: Send + Sync {
    /// Unique short identifier (e.g. `"musicxml"`, `"tiny"`).
    fn id(&self) -> &'static str;

    /// Human-readable display name.
    fn name(&self) -> &'static str;

    /// File extensions associated with this format, **without** the leading
    /// dot. The first extension is the primary one.
    fn extensions(&self) -> &'static [&'static str];

    /// Attempt to detect this format from file content.
    ///
    /// Implementations should only inspect the first few kilobytes; the
    /// method may be called on very large files.
    fn detect(&self, content: &[u8]) -> bool;
}

/// Parse raw bytes into the in-memory score model.
pub trait ScoreReader: ScoreFormat {
    /// Parse `data` into a [`Score`].
    fn read(&self, data: &[u8]) -> NotationResult<Score>;

    /// Read and parse a file from disk.
    fn read_path(&self, path: &Path) -> NotationResult<Score> {
        let data = std::fs::read(path)?;
        self.read(&data)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Runtime registry of available score readers.
///
/// Resolution prefers the file extension; when the extension is unknown or
/// ambiguous, content detection decides.
pub struct NotationRegistry {
    readers: Vec<Box<dyn ScoreReader>>,
}

impl NotationRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Register a score reader.
    pub fn register(&mut self, reader: Box<dyn ScoreReader>) {
        self.readers.push(reader);
    }

    /// Find a reader by file extension (case-insensitive), with optional
    /// content-based fallback.
    pub fn find_reader(&self, ext: &str, content: Option<&[u8]>) -> Option<&dyn ScoreReader> {
        let by_ext = self
            .readers
            .iter()
            .find(|r| r.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)));

        if let Some(reader) = by_ext {
            // An extension match that also recognises the content wins
            // outright; otherwise another format may claim the bytes
            // (e.g. an unrelated XML dialect with a .xml extension).
            match content {
                Some(content) if !reader.detect(content) => {
                    if let Some(claimed) = self.readers.iter().find(|r| r.detect(content)) {
                        return Some(claimed.as_ref());
                    }
                    Some(reader.as_ref())
                }
                _ => Some(reader.as_ref()),
            }
        } else {
            let content = content?;
            self.readers
                .iter()
                .find(|r| r.detect(content))
                .map(|r| r.as_ref())
        }
    }

    /// Find a reader by format ID.
    pub fn find_reader_by_id(&self, id: &str) -> Option<&dyn ScoreReader> {
        self.readers
            .iter()
            .find(|r| r.id() == id)
            .map(|r| r.as_ref())
    }

    /// Resolve a reader for `path` (extension plus a content sniff) and
    /// parse the file.
    pub fn read_path(&self, path: &Path) -> NotationResult<Score> {
        let data = std::fs::read(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let reader = self
            .find_reader(ext, Some(&data))
            .ok_or_else(|| NotationError::UnknownFormat(path.display().to_string()))?;
        reader.read(&data)
    }

    /// Iterate over all registered readers.
    pub fn readers(&self) -> impl Iterator<Item = &dyn ScoreReader> {
        self.readers.iter().map(|r| r.as_ref())
    }

    /// Every extension any registered reader claims.
    pub fn known_extensions(&self) -> Vec<&'static str> {
        self.readers
            .iter()
            .flat_map(|r| r.extensions().iter().copied())
            .collect()
    }
}

impl Default for NotationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal test format for unit tests.
    struct TestFormat;

    impl ScoreFormat for TestFormat {
        fn id(&self) -> &'static str {
            "test"
        }
        fn name(&self) -> &'static str {
            "Test Format"
        }
        fn extensions(&self) -> &'static [&'static str] {
            &["tst", "test"]
        }
        fn detect(&self, content: &[u8]) -> bool {
            content.starts_with(b"TEST")
        }
    }

    impl ScoreReader for TestFormat {
        fn read(&self, _data: &[u8]) -> NotationResult<Score> {
            Ok(Score::default())
        }
    }

    #[test]
    fn find_by_extension() {
        let mut reg = NotationRegistry::new();
        reg.register(Box::new(TestFormat));

        assert!(reg.find_reader("tst", None).is_some());
        assert!(reg.find_reader("test", None).is_some());
        assert!(reg.find_reader("unknown", None).is_none());
    }

    #[test]
    fn find_by_extension_case_insensitive() {
        let mut reg = NotationRegistry::new();
        reg.register(Box::new(TestFormat));

        assert!(reg.find_reader("TST", None).is_some());
        assert!(reg.find_reader("Test", None).is_some());
    }

    #[test]
    fn find_by_content_detection() {
        let mut reg = NotationRegistry::new();
        reg.register(Box::new(TestFormat));

        let found = reg.find_reader("unknown", Some(b"TEST content here"));
        assert!(found.is_some());
        assert_eq!(found.unwrap().id(), "test");

        assert!(reg.find_reader("unknown", Some(b"nope")).is_none());
    }

    #[test]
    fn extension_match_without_content_wins() {
        let mut reg = NotationRegistry::new();
        reg.register(Box::new(TestFormat));

        // Content that the format does not detect still resolves by
        // extension when no other reader claims it.
        let found = reg.find_reader("tst", Some(b"unrecognised"));
        assert!(found.is_some());
    }

    #[test]
    fn find_by_id() {
        let mut reg = NotationRegistry::new();
        reg.register(Box::new(TestFormat));

        assert!(reg.find_reader_by_id("test").is_some());
        assert!(reg.find_reader_by_id("other").is_none());
    }

    #[test]
    fn known_extensions_are_collected() {
        let mut reg = NotationRegistry::new();
        reg.register(Box::new(TestFormat));
        assert_eq!(reg.known_extensions(), vec!["tst", "test"]);
    }
}
