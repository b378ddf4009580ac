//! Exact rational quarter-length durations.
//!
//! Rhythm stems require *exact* duration identity: `1/3` written by one
//! reader must hash and render identically to `1/3` written by another, so
//! durations are rationals, never floats. The canonical text form is the
//! `Ratio` display itself: lowest terms, a bare integer when the denominator
//! is 1 (`1`, `1/2`, `2/3`).

use num_rational::Rational64;

/// Duration of a note in quarter notes.
pub type QuarterLength = Rational64;

/// Quarter length of a notated base value with augmentation dots.
///
/// `base` is the conventional denominator: 1 = whole, 2 = half, 4 = quarter,
/// 8 = eighth, … Each dot extends the duration by half of the previous
/// extension.
pub fn quarter_length(base: u32, dots: u8) -> QuarterLength {
    let mut ql = Rational64::new(4, base as i64);
    let mut extension = ql / 2;
    for _ in 0..dots {
        ql += extension;
        extension /= 2;
    }
    ql
}
