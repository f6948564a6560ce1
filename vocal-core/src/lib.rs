// vocal-core/src/lib.rs

//! The core logic for the octave-free singing trainer.
//! This crate turns raw microphone blocks into a smoothed pitch, judges it
//! against a target pitch class in whatever octave the singer is using,
//! and tracks how long the note has been held. It is completely headless:
//! no capture device and no rendering code live here.
//!
//! Data flows `pitch` → `tracker` → `session`, which composes `anchor`,
//! `voice_range`, `hold` and `advisor` once per display refresh.

pub mod advisor;
pub mod anchor;
pub mod error;
pub mod hold;
pub mod pitch;
pub mod session;
pub mod tracker;
pub mod tuning;
pub mod voice_range;

pub use error::{PitchError, Result};
pub use pitch::{PitchEstimate, SampleBlock};
pub use session::{Feedback, PracticeSession, SessionConfig};
pub use tracker::{FrameStatus, SmoothedFrame, Tracker, TrackerSettings};
pub use tuning::PitchClass;
