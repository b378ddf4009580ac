//! Error types for MusicXML reading.

use thiserror::Error;

/// Errors that can occur while reading a MusicXML document.
#[derive(Debug, Error)]
pub enum MusicXmlError {
    /// An XML-level error (malformed markup, bad encoding).
    #[error("XML error: {0}")]
    Xml(String),

    /// A required attribute or element was missing.
    #[error("missing required {kind}: {name} at {location}")]
    MissingRequired {
        kind: &'static str,
        name: &'static str,
        location: String,
    },

    /// An invalid value was encountered.
    #[error("invalid {kind} value: {value} at {location}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        location: String,
    },

    /// The document is not partwise MusicXML.
    #[error("not a partwise MusicXML document")]
    NotPartwise,
}

impl MusicXmlError {
    pub fn invalid_value(
        kind: &'static str,
        value: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
            location: location.into(),
        }
    }
}

impl From<quick_xml::Error> for MusicXmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}
