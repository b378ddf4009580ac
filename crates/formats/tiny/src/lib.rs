//! Terse melodic notation for FIRMS queries.
//!
//! This crate reads the compact one-line notation used for textual queries
//! (and small fixtures) into the in-memory score model.
//!
//! # Pipeline
//!
//! ```text
//! "3/4 c d e f#4." → lex → parse → Score (one part)
//! ```

pub mod lexer;
pub mod parser;

pub use parser::{ParseError, parse};

/// Terse-notation format handler.
pub struct TinyFormat;

impl firms_notation::ScoreFormat for TinyFormat {
    fn id(&self) -> &'static str {
        "tiny"
    }

    fn name(&self) -> &'static str {
        "Terse melodic notation"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tiny"]
    }

    fn detect(&self, content: &[u8]) -> bool {
        let Ok(text) = std::str::from_utf8(content) else {
            return false;
        };
        let trimmed = text.trim_start();
        if trimmed.starts_with("tiny:") {
            return true;
        }
        // Queries are short; anything larger is some other format.
        trimmed.len() < 4096 && !trimmed.is_empty() && parse(trimmed).is_ok()
    }
}

impl firms_notation::ScoreReader for TinyFormat {
    fn read(&self, data: &[u8]) -> firms_notation::NotationResult<firms_notation::Score> {
        let text = std::str::from_utf8(data)
            .map_err(firms_notation::NotationError::parse)?;
        parse(text).map_err(firms_notation::NotationError::parse)
    }
}
