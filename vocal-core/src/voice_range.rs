//! # Voice Range
//!
//! Note-number windows that bound the octave anchor, and the "auto" policy
//! that picks one from what the singer has been singing recently.
//!
//! The selector is a separate strategy object: neither the tracker nor the
//! anchor know about it. Whoever composes them clears the anchor when the
//! selector reports a change.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PitchError, Result};

/// Median note number at or above which auto mode picks the upper part (A#3).
pub const AUTO_SPLIT_NOTE: f32 = 58.0;

/// How far back auto mode looks.
pub const AUTO_HISTORY_MS: u64 = 2500;

/// Samples needed before auto mode commits to a part.
pub const AUTO_MIN_SAMPLES: usize = 8;

/// Inclusive window of plausible note numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceRange {
    pub min_note: i32,
    pub max_note: i32,
}

impl VoiceRange {
    pub fn new(min_note: i32, max_note: i32) -> Result<Self> {
        if min_note > max_note {
            return Err(PitchError::EmptyVoiceRange {
                min: min_note,
                max: max_note,
            });
        }
        Ok(Self { min_note, max_note })
    }

    pub fn contains(&self, note: i32) -> bool {
        (self.min_note..=self.max_note).contains(&note)
    }
}

/// The two preset ranges a singer can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoicePart {
    /// E2 to E4, roughly bass/baritone/tenor.
    #[default]
    Lower,
    /// E3 to E5, roughly alto/soprano.
    Upper,
}

impl VoicePart {
    pub fn range(self) -> VoiceRange {
        match self {
            VoicePart::Lower => VoiceRange {
                min_note: 40,
                max_note: 64,
            },
            VoicePart::Upper => VoiceRange {
                min_note: 52,
                max_note: 76,
            },
        }
    }

    /// Part implied by a median note number.
    pub fn classify(median_note: f32) -> Self {
        if median_note >= AUTO_SPLIT_NOTE {
            VoicePart::Upper
        } else {
            VoicePart::Lower
        }
    }
}

/// How the active voice range is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRangeMode {
    Manual(VoicePart),
    #[default]
    Auto,
}

/// What the selector decided for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeResolution {
    pub part: VoicePart,
    pub range: VoiceRange,
    /// The part differs from the previous tick's; the anchor must be cleared.
    pub changed: bool,
}

/// Resolves the active voice part, manually or from recent pitch history.
#[derive(Debug, Clone)]
pub struct VoiceRangeSelector {
    mode: VoiceRangeMode,
    part: VoicePart,
    history: VecDeque<(u64, f32)>,
}

impl VoiceRangeSelector {
    /// # Arguments
    /// * `mode` - Manual part or auto detection
    /// * `initial` - Part used in auto mode until enough pitch has been heard
    pub fn new(mode: VoiceRangeMode, initial: VoicePart) -> Self {
        let part = match mode {
            VoiceRangeMode::Manual(part) => part,
            VoiceRangeMode::Auto => initial,
        };
        Self {
            mode,
            part,
            history: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> VoiceRangeMode {
        self.mode
    }

    pub fn part(&self) -> VoicePart {
        self.part
    }

    /// Switches mode. Returns `true` when the active part changed.
    pub fn set_mode(&mut self, mode: VoiceRangeMode) -> bool {
        self.mode = mode;
        self.history.clear();
        match mode {
            VoiceRangeMode::Manual(part) => self.switch_to(part),
            VoiceRangeMode::Auto => false,
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Feeds one tick's detected note number (if any) and resolves the part.
    pub fn observe(&mut self, now_ms: u64, note_number: Option<f32>) -> RangeResolution {
        let changed = match self.mode {
            VoiceRangeMode::Manual(part) => self.switch_to(part),
            VoiceRangeMode::Auto => {
                if let Some(note) = note_number.filter(|n| n.is_finite()) {
                    self.history.push_back((now_ms, note));
                }
                let cutoff = now_ms.saturating_sub(AUTO_HISTORY_MS);
                while self.history.front().is_some_and(|(t, _)| *t < cutoff) {
                    self.history.pop_front();
                }
                match self.median() {
                    Some(median) => self.switch_to(VoicePart::classify(median)),
                    None => false,
                }
            }
        };
        RangeResolution {
            part: self.part,
            range: self.part.range(),
            changed,
        }
    }

    fn median(&self) -> Option<f32> {
        if self.history.len() < AUTO_MIN_SAMPLES {
            return None;
        }
        let mut notes: Vec<f32> = self.history.iter().map(|(_, n)| *n).collect();
        notes.sort_by(|a, b| a.total_cmp(b));
        let mid = notes.len() / 2;
        Some(if notes.len() % 2 == 0 {
            (notes[mid - 1] + notes[mid]) / 2.0
        } else {
            notes[mid]
        })
    }

    fn switch_to(&mut self, part: VoicePart) -> bool {
        if part == self.part {
            return false;
        }
        debug!("voice range {:?} -> {:?}", self.part, part);
        self.part = part;
        true
    }
}
