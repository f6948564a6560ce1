//! # Wrong-Note Advisor
//!
//! Notices when the singer settles on a different pitch class than the
//! target and suggests which way to move. After a suggestion, further ones
//! are suppressed until an explicit cooldown deadline passes.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::tuning::PitchClass;

/// A hint that the singer is holding the wrong note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub sung: PitchClass,
    pub target: PitchClass,
    /// Semitones from the sung pitch class to the target, in `-6..=6`.
    pub semitones_to_target: i32,
}

impl Suggestion {
    pub fn new(sung: PitchClass, target: PitchClass) -> Self {
        let mut diff = target.value() as i32 - sung.value() as i32;
        if diff > 6 {
            diff -= 12;
        } else if diff < -6 {
            diff += 12;
        }
        Self {
            sung,
            target,
            semitones_to_target: diff,
        }
    }
}

/// Timing for the advisor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorSettings {
    /// How long a wrong pitch class must be held before suggesting.
    pub wrong_note_after_ms: u64,
    /// Quiet period after a suggestion.
    pub cooldown_ms: u64,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            wrong_note_after_ms: 1200,
            cooldown_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WrongNoteAdvisor {
    settings: AdvisorSettings,
    streak: Option<(PitchClass, u64)>,
    cooldown_until: Option<u64>,
}

impl WrongNoteAdvisor {
    pub fn new(settings: AdvisorSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        self.streak = None;
        self.cooldown_until = None;
    }

    pub fn in_cooldown(&self, now_ms: u64) -> bool {
        self.cooldown_until.is_some_and(|until| now_ms < until)
    }

    /// Feeds one evaluation.
    ///
    /// # Arguments
    /// * `now_ms` - Evaluation time
    /// * `sung` - Pitch class currently sung, `None` when nothing is pitched
    /// * `target` - Target pitch class
    ///
    /// # Returns
    /// * `Some(suggestion)` on the evaluation that completes a wrong-note streak
    ///   outside the cooldown
    pub fn update(
        &mut self,
        now_ms: u64,
        sung: Option<PitchClass>,
        target: PitchClass,
    ) -> Option<Suggestion> {
        let sung = match sung {
            Some(pc) if pc != target => pc,
            _ => {
                self.streak = None;
                return None;
            }
        };

        let since = match self.streak {
            Some((pc, since)) if pc == sung => since,
            _ => {
                self.streak = Some((sung, now_ms));
                now_ms
            }
        };

        if now_ms.saturating_sub(since) < self.settings.wrong_note_after_ms
            || self.in_cooldown(now_ms)
        {
            return None;
        }

        self.streak = None;
        self.cooldown_until = Some(now_ms.saturating_add(self.settings.cooldown_ms));
        let suggestion = Suggestion::new(sung, target);
        debug!("wrong note suggestion: {:?}", suggestion);
        Some(suggestion)
    }
}
