//! Error types for the vocal core.
//!
//! Only caller-contract violations live here. A quiet microphone, a
//! breathy note or an unpitched consonant are reported through
//! [`FrameStatus`](crate::tracker::FrameStatus), never as an error.

use thiserror::Error;

/// Result type for core operations that can reject their input.
pub type Result<T> = std::result::Result<T, PitchError>;

/// Upstream bugs detected at the core's API boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PitchError {
    /// A pitch class must be in `0..=11`.
    #[error("pitch class out of range: {0} (expected 0..=11)")]
    InvalidPitchClass(i32),

    /// A numeric argument was NaN or infinite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),

    /// The voice-range window is inverted.
    #[error("empty voice range: min note {min} is above max note {max}")]
    EmptyVoiceRange { min: i32, max: i32 },

    /// A note name could not be parsed into a pitch class.
    #[error("unrecognised note name: {0:?}")]
    UnknownNoteName(String),
}
