//! # Practice Session
//!
//! Consumer-side composition of the core pieces. Once per display refresh
//! the session takes the tracker's smoothed frame and runs, in order:
//! voice-range resolution, the octave anchor, the in-tune judgment, the
//! hold timer and the wrong-note advisor.
//!
//! All state lives in the session and is mutated from a single cadence.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::advisor::{AdvisorSettings, Suggestion, WrongNoteAdvisor};
use crate::anchor::{self, OctaveAnchor};
use crate::error::Result;
use crate::hold::{HoldProgress, HoldTimer};
use crate::tracker::{FrameStatus, SmoothedFrame, Tracker};
use crate::tuning::{self, PitchClass};
use crate::voice_range::{VoicePart, VoiceRangeMode, VoiceRangeSelector};

/// Session behaviour, loadable from the trainer's config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long the note must be held in tune to succeed.
    pub hold_duration_ms: u64,
    /// Largest tuning error (either side) that still counts as in tune.
    pub in_tune_tolerance_cents: f32,
    pub voice_range: VoiceRangeMode,
    /// Part assumed in auto mode before enough pitch has been heard.
    pub initial_part: VoicePart,
    pub advisor: AdvisorSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: 1500,
            in_tune_tolerance_cents: 35.0,
            voice_range: VoiceRangeMode::Auto,
            initial_part: VoicePart::Lower,
            advisor: AdvisorSettings::default(),
        }
    }
}

/// One point of the scrolling pitch trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailSample {
    pub timestamp_ms: u64,
    /// Signed offset from the anchor note, in cents.
    pub cents_offset: f32,
    pub rms: f32,
}

/// Everything a renderer needs for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Feedback {
    pub timestamp_ms: u64,
    pub status: FrameStatus,
    pub sung_pitch_class: Option<PitchClass>,
    /// Octave-invariant tuning error used for the in-tune judgment.
    pub tuning_cents: Option<f32>,
    pub in_tune: bool,
    pub anchor_note: Option<i32>,
    pub trail: Option<TrailSample>,
    pub voice_part: VoicePart,
    pub hold: HoldProgress,
    pub suggestion: Option<Suggestion>,
}

/// A singer practising one target pitch class.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    config: SessionConfig,
    target: PitchClass,
    selector: VoiceRangeSelector,
    anchor: OctaveAnchor,
    hold: HoldTimer,
    advisor: WrongNoteAdvisor,
}

impl PracticeSession {
    pub fn new(target: PitchClass, config: SessionConfig) -> Self {
        Self {
            config,
            target,
            selector: VoiceRangeSelector::new(config.voice_range, config.initial_part),
            anchor: OctaveAnchor::new(),
            hold: HoldTimer::new(),
            advisor: WrongNoteAdvisor::new(config.advisor),
        }
    }

    pub fn target(&self) -> PitchClass {
        self.target
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn voice_part(&self) -> VoicePart {
        self.selector.part()
    }

    pub fn anchor_note(&self) -> Option<i32> {
        self.anchor.current()
    }

    /// Changes the target; the anchor, hold streak and advisor start over.
    pub fn set_target(&mut self, target: PitchClass) {
        if target == self.target {
            return;
        }
        debug!("target {} -> {}", self.target, target);
        self.target = target;
        self.anchor.reset();
        self.hold.reset();
        self.advisor.reset();
    }

    /// Changes how the voice range is chosen; the anchor starts over.
    pub fn set_voice_range_mode(&mut self, mode: VoiceRangeMode) {
        self.config.voice_range = mode;
        self.selector.set_mode(mode);
        self.anchor.reset();
    }

    /// Clears all per-streak state.
    pub fn reset(&mut self) {
        self.selector.reset();
        self.anchor.reset();
        self.hold.reset();
        self.advisor.reset();
    }

    /// Queries the tracker for this session's target and evaluates the frame.
    pub fn tick(&mut self, tracker: &Tracker, now_ms: u64) -> Result<Feedback> {
        let frame = tracker.smoothed_frame(self.target, now_ms);
        self.evaluate(&frame, now_ms)
    }

    /// Evaluates one smoothed frame.
    ///
    /// # Arguments
    /// * `frame` - Smoothed tracker output
    /// * `now_ms` - Display time of this evaluation
    ///
    /// # Returns
    /// * `Feedback` for the renderer
    /// * `Err` only if the frame carries a non-finite note number
    pub fn evaluate(&mut self, frame: &SmoothedFrame, now_ms: u64) -> Result<Feedback> {
        let resolution = self.selector.observe(now_ms, frame.note_number);
        if resolution.changed {
            self.anchor.reset();
        }

        let pitched = frame.note_number.filter(|_| frame.status == FrameStatus::Listening);
        let (anchor_note, trail, tuning_cents) = match pitched {
            Some(note) => {
                let anchor_note = self.anchor.update(note, self.target, resolution.range)?;
                let trail = TrailSample {
                    timestamp_ms: frame.timestamp_ms,
                    cents_offset: anchor::cents_from_anchor(note, anchor_note),
                    rms: frame.rms,
                };
                let cents = tuning::cents_from_nearest_target(note, self.target);
                (Some(anchor_note), Some(trail), Some(cents))
            }
            None => (self.anchor.current(), None, None),
        };

        let in_tune = tuning_cents
            .is_some_and(|c| tuning::is_in_tune(c, self.config.in_tune_tolerance_cents));
        let hold = self.hold.update(in_tune, now_ms, self.config.hold_duration_ms);
        if hold.just_succeeded {
            info!("held {} for {} ms", self.target, self.config.hold_duration_ms);
        }

        let sung_pitch_class = pitched.map(PitchClass::from_note_number);
        let suggestion = self.advisor.update(now_ms, sung_pitch_class, self.target);

        Ok(Feedback {
            timestamp_ms: now_ms,
            status: frame.status,
            sung_pitch_class,
            tuning_cents,
            in_tune,
            anchor_note,
            trail,
            voice_part: resolution.part,
            hold,
            suggestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> PitchClass {
        PitchClass::new(9).unwrap()
    }

    fn frame_at(note: f32, ts: u64) -> SmoothedFrame {
        SmoothedFrame {
            timestamp_ms: ts,
            status: FrameStatus::Listening,
            frequency_hz: Some(tuning::note_number_to_hz(note)),
            clarity: 0.95,
            rms: 0.2,
            note_number: Some(note),
            pitch_class: Some(PitchClass::from_note_number(note)),
            cents_from_target: None,
        }
    }

    fn quiet(ts: u64) -> SmoothedFrame {
        SmoothedFrame {
            timestamp_ms: ts,
            status: FrameStatus::TooQuiet,
            ..SmoothedFrame::default()
        }
    }

    fn manual(part: VoicePart) -> SessionConfig {
        SessionConfig {
            voice_range: VoiceRangeMode::Manual(part),
            hold_duration_ms: 1000,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn in_tune_in_any_octave_completes_hold() {
        let mut session = PracticeSession::new(a(), manual(VoicePart::Lower));
        // A2 sung slightly sharp, well below the upper part's octave.
        let mut last = None;
        for t in (0..=1000).step_by(50) {
            last = Some(session.evaluate(&frame_at(45.1, t), t).unwrap());
            if t < 1000 {
                assert!(!last.unwrap().hold.success);
            }
        }
        let fb = last.unwrap();
        assert!(fb.in_tune);
        assert!(fb.hold.just_succeeded);
        assert_eq!(fb.anchor_note, Some(45));
        assert!((fb.trail.unwrap().cents_offset - 10.0).abs() < 0.5);
        assert!((fb.tuning_cents.unwrap() - 10.0).abs() < 0.5);
    }

    #[test]
    fn out_of_tune_resets_progress() {
        let mut session = PracticeSession::new(a(), manual(VoicePart::Lower));
        session.evaluate(&frame_at(57.0, 0), 0).unwrap();
        assert!(session.evaluate(&frame_at(57.0, 500), 500).unwrap().hold.progress > 0.4);
        let off = session.evaluate(&frame_at(57.6, 600), 600).unwrap();
        assert!(!off.in_tune);
        assert_eq!(off.hold.progress, 0.0);
        let quiet = session.evaluate(&quiet(700), 700).unwrap();
        assert_eq!(quiet.status, FrameStatus::TooQuiet);
        assert!(quiet.trail.is_none());
        assert_eq!(quiet.anchor_note, Some(57));
    }

    #[test]
    fn display_offset_tracks_anchor_not_nearest_octave() {
        let mut session = PracticeSession::new(a(), manual(VoicePart::Lower));
        session.evaluate(&frame_at(57.0, 0), 0).unwrap();
        // A fourth above A3 stays drawn against A3.
        let fb = session.evaluate(&frame_at(62.0, 50), 50).unwrap();
        assert_eq!(fb.anchor_note, Some(57));
        assert!((fb.trail.unwrap().cents_offset - 500.0).abs() < 0.5);
        assert!((fb.tuning_cents.unwrap() - 500.0).abs() < 0.5);
        assert!(!fb.in_tune);
    }

    #[test]
    fn auto_range_switch_clears_anchor() {
        let config = SessionConfig {
            initial_part: VoicePart::Lower,
            ..SessionConfig::default()
        };
        let mut session = PracticeSession::new(a(), config);
        let first = session.evaluate(&frame_at(64.0, 0), 0).unwrap();
        assert_eq!(first.voice_part, VoicePart::Lower);
        assert_eq!(first.anchor_note, Some(57));
        let mut fb = first;
        for i in 1..8 {
            fb = session.evaluate(&frame_at(64.0, i * 50), i * 50).unwrap();
        }
        assert_eq!(fb.voice_part, VoicePart::Upper);
        // Fresh anchor in the upper window: nearest A to E4 there is A4.
        assert_eq!(fb.anchor_note, Some(69));
    }

    #[test]
    fn wrong_note_is_suggested() {
        let mut session = PracticeSession::new(a(), manual(VoicePart::Lower));
        let mut suggestion = None;
        for t in (0..=1300).step_by(100) {
            let fb = session.evaluate(&frame_at(55.0, t), t).unwrap();
            suggestion = suggestion.or(fb.suggestion);
        }
        let s = suggestion.expect("G held against A should be flagged");
        assert_eq!(s.sung, PitchClass::new(7).unwrap());
        assert_eq!(s.semitones_to_target, 2);
    }

    #[test]
    fn changing_target_restarts_streak() {
        let mut session = PracticeSession::new(a(), manual(VoicePart::Lower));
        session.evaluate(&frame_at(57.0, 0), 0).unwrap();
        session.evaluate(&frame_at(57.0, 900), 900).unwrap();
        session.set_target(PitchClass::new(7).unwrap());
        assert_eq!(session.anchor_note(), None);
        let fb = session.evaluate(&frame_at(55.0, 1000), 1000).unwrap();
        assert_eq!(fb.hold.elapsed_ms, 0);
        assert_eq!(fb.anchor_note, Some(55));
    }

    #[test]
    fn config_from_json() {
        let config: SessionConfig = serde_json::from_str(
            r#"{ "hold_duration_ms": 2000, "voice_range": { "manual": "upper" } }"#,
        )
        .unwrap();
        assert_eq!(config.hold_duration_ms, 2000);
        assert_eq!(config.voice_range, VoiceRangeMode::Manual(VoicePart::Upper));
        assert_eq!(config.in_tune_tolerance_cents, 35.0);

        let auto: SessionConfig = serde_json::from_str(r#"{ "voice_range": "auto" }"#).unwrap();
        assert_eq!(auto.voice_range, VoiceRangeMode::Auto);
    }
}
