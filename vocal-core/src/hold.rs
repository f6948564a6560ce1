//! Continuous in-tune hold timer.

use log::debug;
use serde::Serialize;

/// Where the current streak stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldState {
    #[default]
    Idle,
    Holding { since_ms: u64 },
    Held { since_ms: u64 },
}

/// Result of one [`HoldTimer::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HoldProgress {
    /// `elapsed / required`, capped at 1.
    pub progress: f32,
    pub elapsed_ms: u64,
    pub success: bool,
    /// True on exactly one call per unbroken streak.
    pub just_succeeded: bool,
}

/// Tracks how long the singer has stayed in tune without a break.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoldTimer {
    state: HoldState,
}

impl HoldTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HoldState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = HoldState::Idle;
    }

    /// Advances the timer by one evaluation.
    ///
    /// # Arguments
    /// * `in_tune` - Whether this evaluation counts as in tune
    /// * `now_ms` - Evaluation time
    /// * `required_ms` - Hold length that counts as success
    pub fn update(&mut self, in_tune: bool, now_ms: u64, required_ms: u64) -> HoldProgress {
        if !in_tune {
            if self.state != HoldState::Idle {
                debug!("hold streak broken");
            }
            self.state = HoldState::Idle;
            return HoldProgress::default();
        }

        let since_ms = match self.state {
            HoldState::Idle => {
                self.state = HoldState::Holding { since_ms: now_ms };
                now_ms
            }
            HoldState::Holding { since_ms } | HoldState::Held { since_ms } => since_ms,
        };
        let elapsed_ms = now_ms.saturating_sub(since_ms);
        let progress = if required_ms == 0 {
            1.0
        } else {
            (elapsed_ms as f32 / required_ms as f32).min(1.0)
        };

        let reached = elapsed_ms >= required_ms;
        let just_succeeded = reached && matches!(self.state, HoldState::Holding { .. });
        if just_succeeded {
            debug!("hold succeeded after {} ms", elapsed_ms);
            self.state = HoldState::Held { since_ms };
        }

        HoldProgress {
            progress,
            elapsed_ms,
            success: matches!(self.state, HoldState::Held { .. }),
            just_succeeded,
        }
    }
}
