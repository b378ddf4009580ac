//! Parser for the terse melodic notation.
//!
//! Single pass over the token stream, producing a one-part [`Score`].
//! Durations are sticky: a note without an explicit duration repeats the
//! previous one (initially a quarter). Triplet groups scale their members
//! by 2/3 exactly; the time signature only drives measure numbering.

use thiserror::Error;

use firms_model::{
    GeneralNote, Part, Pitch, QuarterLength, Score, Step, quarter_length,
};

use crate::lexer::{LexError, Lexer, NoteWord, Token};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("unexpected token at byte offset {offset}: {message}")]
    Unexpected { offset: usize, message: String },

    #[error("unexpected end of input: {expected}")]
    UnexpectedEof { expected: String },
}

/// Parse a complete source string into a score.
pub fn parse(src: &str) -> Result<Score, ParseError> {
    Parser::new(src).parse()
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    /// Sticky duration: (denominator, dots).
    duration: (u32, u8),
    /// Quarter lengths per measure under the current time signature.
    measure_length: QuarterLength,
    /// Running position in quarter lengths.
    position: QuarterLength,
    in_triplet: bool,
    events: Vec<GeneralNote>,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str) -> Self {
        Self {
            lexer: Lexer::new(src),
            duration: (4, 0),
            measure_length: QuarterLength::from_integer(4),
            position: QuarterLength::from_integer(0),
            in_triplet: false,
            events: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Score, ParseError> {
        loop {
            let spanned = self.lexer.next_token()?;
            match spanned.token {
                Token::Eof => break,
                Token::Time { beats, unit } => {
                    self.measure_length =
                        QuarterLength::new(beats as i64 * 4, unit as i64);
                }
                Token::TripletOpen => {
                    if self.in_triplet {
                        return Err(ParseError::Unexpected {
                            offset: spanned.span.start,
                            message: "triplet groups do not nest".into(),
                        });
                    }
                    self.in_triplet = true;
                }
                Token::GroupClose => {
                    if !self.in_triplet {
                        return Err(ParseError::Unexpected {
                            offset: spanned.span.start,
                            message: "'}' without an open group".into(),
                        });
                    }
                    self.in_triplet = false;
                }
                Token::Note(word) => self.push_note(word),
                Token::Rest(word) => {
                    let ql = self.event_length(word.duration, word.dots);
                    self.push_event(GeneralNote::rest(ql));
                }
            }
        }
        if self.in_triplet {
            return Err(ParseError::UnexpectedEof {
                expected: "'}' closing the triplet group".into(),
            });
        }

        let mut part = Part::new(None);
        part.events = self.events;
        let mut score = Score::new(None);
        score.parts.push(part);
        Ok(score)
    }

    fn push_note(&mut self, word: NoteWord) {
        let ql = self.event_length(word.duration, word.dots);
        let step = match Step::from_letter(word.step) {
            Some(step) => step,
            None => unreachable!("the lexer only emits a-g note letters"),
        };
        let pitch = Pitch::new(step, word.alter, word.octave);
        self.push_event(GeneralNote::note(pitch, ql));
    }

    /// Resolve the sticky duration and apply the triplet scale.
    fn event_length(&mut self, duration: Option<u32>, dots: u8) -> QuarterLength {
        if let Some(base) = duration {
            self.duration = (base, dots);
        }
        let (base, dots) = self.duration;
        let mut ql = quarter_length(base, dots);
        if self.in_triplet {
            ql *= QuarterLength::new(2, 3);
        }
        ql
    }

    fn push_event(&mut self, event: GeneralNote) {
        let measure = (self.position / self.measure_length).floor().to_integer() as u32;
        self.position += event.quarter_length;
        self.events.push(event.in_measure(measure));
    }
}
