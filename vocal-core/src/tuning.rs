//! # Musical Tuning Module
//!
//! Pitch arithmetic shared by the tracker, the octave anchor and the
//! session. Everything here is a pure function of its arguments.
//!
//! ## Features
//! - Equal temperament frequency/note-number conversion (A4 = 440 Hz = note 69)
//! - Octave-invariant pitch classes (`0` = C ... `11` = B)
//! - Nearest octave-equivalent of a target pitch class, with cents error
//! - Note naming and parsing for the trainer's command line

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PitchError, Result};

/// Reference frequency of note number 69 (A4).
pub const A4_FREQUENCY: f32 = 440.0;

/// Note number of the reference frequency.
pub const A4_NOTE_NUMBER: f32 = 69.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// An octave-invariant pitch class, always in `0..=11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct PitchClass(u8);

impl PitchClass {
    /// Validates a caller-supplied pitch class.
    ///
    /// # Returns
    /// * `Ok(pc)` - for values in `0..=11`
    /// * `Err(PitchError::InvalidPitchClass)` - anything else
    pub fn new(value: i32) -> Result<Self> {
        if (0..12).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(PitchError::InvalidPitchClass(value))
        }
    }

    /// Reduces any integer note number into its pitch class.
    pub fn from_note(note: i32) -> Self {
        Self(note.rem_euclid(12) as u8)
    }

    /// Pitch class of a fractional note number, rounded to the nearest semitone.
    pub fn from_note_number(note_number: f32) -> Self {
        Self::from_note(note_number.round() as i32)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }
}

impl TryFrom<i32> for PitchClass {
    type Error = PitchError;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PitchClass> for i32 {
    fn from(pc: PitchClass) -> i32 {
        pc.0 as i32
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts a frequency in Hz to a fractional note number.
///
/// `noteNumber = 69 + 12 * log2(f / 440)`. Only meaningful for `freq > 0`.
pub fn hz_to_note_number(freq: f32) -> f32 {
    A4_NOTE_NUMBER + 12.0 * (freq / A4_FREQUENCY).log2()
}

/// Converts a (possibly fractional) note number back to Hz.
pub fn note_number_to_hz(note_number: f32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((note_number - A4_NOTE_NUMBER) / 12.0)
}

/// Reduces an integer note number into `0..=11`, whatever its sign.
pub fn reduce_pitch_class(note: i32) -> u8 {
    PitchClass::from_note(note).value()
}

/// Octave-blind comparison of two note numbers or pitch classes.
pub fn matches_pitch_class(a: i32, b: i32) -> bool {
    reduce_pitch_class(a) == reduce_pitch_class(b)
}

/// Finds the octave-equivalent of `target` closest to what was sung.
///
/// The detected note number is rounded, then shifted by the signed
/// pitch-class difference folded into `[-6, 6]`.
///
/// # Arguments
/// * `detected` - Fractional note number of the sung pitch
/// * `target` - Target pitch class
///
/// # Returns
/// * Integer note number whose pitch class is `target`
pub fn nearest_target_note_number(detected: f32, target: PitchClass) -> i32 {
    // Saturates for absurd inputs rather than overflowing.
    let rounded = detected.round() as i32;
    let mut diff = target.value() as i32 - reduce_pitch_class(rounded) as i32;
    if diff > 6 {
        diff -= 12;
    } else if diff < -6 {
        diff += 12;
    }
    rounded.saturating_add(diff)
}

/// Signed tuning error against the nearest octave-equivalent of `target`.
///
/// Positive values are sharp, negative values are flat.
pub fn cents_from_nearest_target(detected: f32, target: PitchClass) -> f32 {
    (detected - nearest_target_note_number(detected, target) as f32) * 100.0
}

/// Calculates the deviation from a target frequency in cents.
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `target_freq` - Target frequency in Hz
///
/// # Returns
/// * Cent deviation (positive = sharp, negative = flat)
pub fn cents_between(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// True when a tuning error is within `tolerance_cents` either side.
pub fn is_in_tune(cents: f32, tolerance_cents: f32) -> bool {
    cents.abs() <= tolerance_cents
}

/// Scientific pitch notation for an integer note number, e.g. `"A4"`.
pub fn note_name(note: i32) -> String {
    let octave = note.div_euclid(12) - 1;
    format!("{}{}", PitchClass::from_note(note).name(), octave)
}

/// Parses a pitch class name such as `"A"`, `"c#"` or `"Bb"`.
pub fn parse_pitch_class(name: &str) -> Result<PitchClass> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    let base = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(PitchError::UnknownNoteName(name.to_string())),
    };
    let accidental = match chars.as_str() {
        "" => 0,
        "#" | "♯" => 1,
        "b" | "♭" => -1,
        _ => return Err(PitchError::UnknownNoteName(name.to_string())),
    };
    Ok(PitchClass::from_note(base + accidental))
}
