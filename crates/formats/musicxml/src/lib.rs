//! MusicXML reading for FIRMS.
//!
//! Reads partwise MusicXML into the in-memory score model. Only the subset
//! that retrieval cares about is interpreted; everything else (layout,
//! dynamics, articulations) is skipped without complaint.
//!
//! # Pipeline
//!
//! ```text
//! .musicxml/.xml → quick-xml events → Score (parts, notes, repeats)
//! ```

mod error;
mod reader;

pub use error::MusicXmlError;
pub use reader::read_score;

/// MusicXML format handler.
pub struct MusicXmlFormat;

impl firms_notation::ScoreFormat for MusicXmlFormat {
    fn id(&self) -> &'static str {
        "musicxml"
    }

    fn name(&self) -> &'static str {
        "MusicXML"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["musicxml", "xml"]
    }

    fn detect(&self, content: &[u8]) -> bool {
        let prefix = &content[..content.len().min(4096)];
        let s = std::str::from_utf8(prefix).unwrap_or("");
        s.contains("<score-partwise")
    }
}

impl firms_notation::ScoreReader for MusicXmlFormat {
    fn read(&self, data: &[u8]) -> firms_notation::NotationResult<firms_notation::Score> {
        let xml = std::str::from_utf8(data).map_err(firms_notation::NotationError::parse)?;
        read_score(xml).map_err(firms_notation::NotationError::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firms_notation::{ScoreFormat, ScoreReader};

    #[test]
    fn detects_partwise_documents() {
        assert!(MusicXmlFormat.detect(b"<?xml version=\"1.0\"?><score-partwise version=\"4.0\">"));
        assert!(!MusicXmlFormat.detect(b"<mei xmlns=\"http://www.music-encoding.org/ns/mei\">"));
        assert!(!MusicXmlFormat.detect(b"tiny: c d e"));
    }

    #[test]
    fn read_maps_errors_to_parse() {
        let err = MusicXmlFormat.read(b"<not-music/>").unwrap_err();
        assert!(matches!(err, firms_notation::NotationError::Parse(_)));
    }
}
