//! Lexer for the terse melodic notation.
//!
//! The notation is a whitespace-separated sequence of note words, rest
//! words, an optional leading `tiny:` tag, an optional time signature, and
//! triplet groups:
//!
//! ```text
//! tiny: 3/4 c d e4. f#8 r2 trip{g8 a b} c'4~ c'
//! ```
//!
//! Note words encode octave by letter case and repetition (`c` = C4,
//! `c'` = C5, `C` = C3, `CC` = C2), accidentals as `#`/`-`/`n` runs, and
//! duration as the conventional denominator with optional dots. A trailing
//! `~` marks a tie; a trailing `=name` annotation is ignored.

use thiserror::Error;

/// Byte offset span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token produced by the lexer, together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// The pitch-and-duration payload of a note word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteWord {
    /// Step letter, uppercased.
    pub step: char,
    /// Scientific octave resolved from case, repetition, and marks.
    pub octave: i8,
    /// Semitone alteration (`#` runs positive, `-` runs negative).
    pub alter: i8,
    /// Notated duration denominator, when given.
    pub duration: Option<u32>,
    pub dots: u8,
    /// Trailing `~` (kept for completeness; ties do not merge events).
    pub tie: bool,
}

/// The duration payload of a rest word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestWord {
    pub duration: Option<u32>,
    pub dots: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Time signature word, e.g. `3/4`.
    Time { beats: u32, unit: u32 },
    Note(NoteWord),
    Rest(RestWord),
    /// `trip{` — opens a triplet group.
    TripletOpen,
    /// `}` — closes the innermost group.
    GroupClose,
    Eof,
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error("unrecognised word '{word}' at byte offset {offset}")]
    InvalidWord { word: String, offset: usize },

    #[error("invalid duration '{duration}' at byte offset {offset}")]
    InvalidDuration { duration: u32, offset: usize },
}

const VALID_DURATIONS: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];

/// Streaming lexer over the source text.
pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        let mut lexer = Self { src, pos: 0 };
        lexer.skip_whitespace();
        // The optional leading tag carries no information.
        if lexer.src[lexer.pos..].starts_with("tiny:") {
            lexer.pos += "tiny:".len();
        }
        lexer
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.src[self.pos..].chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    /// Next token; `Eof` at the end of input.
    pub fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        self.skip_whitespace();
        let start = self.pos;
        let rest = &self.src[self.pos..];

        if rest.is_empty() {
            return Ok(SpannedToken {
                token: Token::Eof,
                span: Span::new(start, start),
            });
        }
        if let Some(stripped) = rest.strip_prefix("trip{") {
            self.pos = self.src.len() - stripped.len();
            return Ok(SpannedToken {
                token: Token::TripletOpen,
                span: Span::new(start, self.pos),
            });
        }
        if let Some(stripped) = rest.strip_prefix('}') {
            self.pos = self.src.len() - stripped.len();
            return Ok(SpannedToken {
                token: Token::GroupClose,
                span: Span::new(start, self.pos),
            });
        }

        // Take characters up to the next whitespace or closing brace.
        let word_len = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || *c == '}')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let word = &rest[..word_len];
        self.pos += word_len;

        let token = self.classify(word, start)?;
        Ok(SpannedToken {
            token,
            span: Span::new(start, start + word_len),
        })
    }

    fn classify(&self, word: &str, offset: usize) -> Result<Token, LexError> {
        if let Some(token) = parse_time_signature(word) {
            return Ok(token);
        }
        if let Some(token) = parse_rest(word, offset)? {
            return Ok(token);
        }
        if let Some(token) = parse_note(word, offset)? {
            return Ok(token);
        }
        Err(LexError::InvalidWord {
            word: word.to_string(),
            offset,
        })
    }
}

fn parse_time_signature(word: &str) -> Option<Token> {
    let (beats, unit) = word.split_once('/')?;
    let beats: u32 = beats.parse().ok()?;
    let unit: u32 = unit.parse().ok()?;
    if beats == 0 || unit == 0 {
        return None;
    }
    Some(Token::Time { beats, unit })
}

/// Duration digits plus dots, shared by notes and rests.
fn parse_duration(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    offset: usize,
) -> Result<(Option<u32>, u8), LexError> {
    let mut digits = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    let duration = if digits.is_empty() {
        None
    } else {
        // The digit run is bounded, so this parse cannot overflow-fail
        // in practice; treat any failure as an invalid duration.
        let value: u32 = digits
            .parse()
            .map_err(|_| LexError::InvalidDuration { duration: 0, offset })?;
        if !VALID_DURATIONS.contains(&value) {
            return Err(LexError::InvalidDuration {
                duration: value,
                offset,
            });
        }
        Some(value)
    };
    let mut dots = 0u8;
    while chars.peek() == Some(&'.') {
        dots += 1;
        chars.next();
    }
    Ok((duration, dots))
}

fn parse_rest(word: &str, offset: usize) -> Result<Option<Token>, LexError> {
    let Some(body) = word.strip_prefix('r') else {
        return Ok(None);
    };
    let mut chars = body.chars().peekable();
    let (duration, dots) = parse_duration(&mut chars, offset)?;
    if chars.next().is_some() {
        // Not a rest after all (e.g. a stray word starting with 'r').
        return Ok(None);
    }
    Ok(Some(Token::Rest(RestWord { duration, dots })))
}

fn parse_note(word: &str, offset: usize) -> Result<Option<Token>, LexError> {
    let mut chars = word.chars().peekable();
    let first = match chars.peek() {
        Some(c @ ('a'..='g' | 'A'..='G')) => *c,
        _ => return Ok(None),
    };

    let mut letters = 0usize;
    while chars.peek() == Some(&first) {
        letters += 1;
        chars.next();
    }

    let mut octave_marks = 0i8;
    while chars.peek() == Some(&'\'') {
        octave_marks += 1;
        chars.next();
    }

    let mut alter = 0i8;
    loop {
        match chars.peek() {
            Some('#') => {
                alter += 1;
                chars.next();
            }
            Some('-') => {
                alter -= 1;
                chars.next();
            }
            Some('n') => {
                alter = 0;
                chars.next();
            }
            _ => break,
        }
    }

    let (duration, dots) = parse_duration(&mut chars, offset)?;

    let mut tie = false;
    if chars.peek() == Some(&'~') {
        tie = true;
        chars.next();
    }

    // `=name` annotations label a note for editors; retrieval ignores them.
    if chars.peek() == Some(&'=') {
        while chars.next().is_some() {}
    }

    if chars.next().is_some() {
        return Err(LexError::InvalidWord {
            word: word.to_string(),
            offset,
        });
    }

    let octave = if first.is_ascii_lowercase() {
        4 + octave_marks
    } else {
        3 - (letters as i8 - 1)
    };
    Ok(Some(Token::Note(NoteWord {
        step: first.to_ascii_uppercase(),
        octave,
        alter,
        duration,
        dots,
        tie,
    })))
}
