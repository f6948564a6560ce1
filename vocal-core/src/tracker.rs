//! # Pitch Tracker
//!
//! Classifies every incoming block, keeps a short time-ordered history and
//! produces a median-smoothed frame on demand.
//!
//! The tracker is written to from the audio path (`ingest`) and read from
//! the display path (`smoothed_frame`) at a different cadence. Both take
//! `&self`; the history lock is held only to push/trim or to copy the
//! window out, never while estimating or smoothing.

use std::collections::VecDeque;

use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::pitch::{self, PitchEstimate, SampleBlock};
use crate::tuning::{self, PitchClass};

/// History is never trimmed below this age, whatever the smoothing window.
pub const MIN_HISTORY_MS: u64 = 1200;

/// Tracker configuration. Changes apply from the next ingested block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Blocks quieter than this RMS level are `TooQuiet`.
    pub rms_threshold: f32,
    /// Estimates below this clarity are `LowConfidence`.
    pub clarity_threshold: f32,
    /// Trailing window used for smoothing.
    pub smoothing_window_ms: u64,
    /// Estimator search band.
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            rms_threshold: 0.01,
            clarity_threshold: 0.75,
            smoothing_window_ms: 180,
            min_hz: pitch::DEFAULT_MIN_HZ,
            max_hz: pitch::DEFAULT_MAX_HZ,
        }
    }
}

/// Partial settings update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettingsPatch {
    pub rms_threshold: Option<f32>,
    pub clarity_threshold: Option<f32>,
    pub smoothing_window_ms: Option<u64>,
    pub min_hz: Option<f32>,
    pub max_hz: Option<f32>,
}

impl TrackerSettings {
    pub fn apply(&mut self, patch: TrackerSettingsPatch) {
        if let Some(v) = patch.rms_threshold {
            self.rms_threshold = v;
        }
        if let Some(v) = patch.clarity_threshold {
            self.clarity_threshold = v;
        }
        if let Some(v) = patch.smoothing_window_ms {
            self.smoothing_window_ms = v;
        }
        if let Some(v) = patch.min_hz {
            self.min_hz = v;
        }
        if let Some(v) = patch.max_hz {
            self.max_hz = v;
        }
    }

    /// How long raw frames are retained.
    pub fn history_ms(&self) -> u64 {
        MIN_HISTORY_MS.max(self.smoothing_window_ms.saturating_mul(3))
    }
}

/// Per-frame tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Nothing ingested yet.
    #[default]
    Idle,
    Listening,
    TooQuiet,
    NoPitch,
    LowConfidence,
}

/// Outcome of classifying one block, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    TooQuiet,
    NoPitch,
    /// A frequency was measured but is not trusted; it is discarded.
    LowConfidence { clarity: f32 },
    Pitched { frequency_hz: f32, clarity: f32 },
}

impl Reading {
    /// Gates on level, then estimates and gates on clarity.
    ///
    /// The estimator only runs when the block is loud enough.
    pub fn classify(block: &SampleBlock<'_>, rms: f32, settings: &TrackerSettings) -> Self {
        if rms < settings.rms_threshold {
            return Reading::TooQuiet;
        }
        match pitch::estimate(block, settings.min_hz, settings.max_hz) {
            PitchEstimate { frequency_hz: None, .. } => Reading::NoPitch,
            PitchEstimate { clarity, .. } if clarity < settings.clarity_threshold => {
                Reading::LowConfidence { clarity }
            }
            PitchEstimate {
                frequency_hz: Some(frequency_hz),
                clarity,
            } => Reading::Pitched { frequency_hz, clarity },
        }
    }

    pub fn status(&self) -> FrameStatus {
        match self {
            Reading::TooQuiet => FrameStatus::TooQuiet,
            Reading::NoPitch => FrameStatus::NoPitch,
            Reading::LowConfidence { .. } => FrameStatus::LowConfidence,
            Reading::Pitched { .. } => FrameStatus::Listening,
        }
    }
}

/// One classified block as stored in the history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub timestamp_ms: u64,
    pub status: FrameStatus,
    pub frequency_hz: Option<f32>,
    pub clarity: f32,
    pub rms: f32,
}

impl RawFrame {
    pub fn from_reading(timestamp_ms: u64, reading: Reading, rms: f32) -> Self {
        let (frequency_hz, clarity) = match reading {
            Reading::TooQuiet | Reading::NoPitch => (None, 0.0),
            Reading::LowConfidence { clarity } => (None, clarity),
            Reading::Pitched { frequency_hz, clarity } => (Some(frequency_hz), clarity),
        };
        Self {
            timestamp_ms,
            status: reading.status(),
            frequency_hz,
            clarity,
            rms,
        }
    }
}

/// Smoothed view over the trailing window, recomputed on every query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SmoothedFrame {
    pub timestamp_ms: u64,
    pub status: FrameStatus,
    pub frequency_hz: Option<f32>,
    pub clarity: f32,
    pub rms: f32,
    /// Fractional note number of the smoothed frequency.
    pub note_number: Option<f32>,
    pub pitch_class: Option<PitchClass>,
    /// Octave-invariant tuning error against the requested target.
    pub cents_from_target: Option<f32>,
}

impl SmoothedFrame {
    pub fn has_pitch(&self) -> bool {
        self.note_number.is_some()
    }
}

#[derive(Debug, Default)]
struct History {
    frames: VecDeque<RawFrame>,
    latest: Option<RawFrame>,
}

impl History {
    fn push(&mut self, frame: RawFrame, keep_ms: u64) {
        self.frames.push_back(frame);
        self.latest = Some(frame);
        let cutoff = frame.timestamp_ms.saturating_sub(keep_ms);
        while self
            .frames
            .front()
            .is_some_and(|f| f.timestamp_ms < cutoff)
        {
            self.frames.pop_front();
        }
    }
}

/// Real-time pitch tracker. Share it between threads with an `Arc`.
#[derive(Debug, Default)]
pub struct Tracker {
    settings: RwLock<TrackerSettings>,
    history: Mutex<History>,
}

impl Tracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            history: Mutex::new(History::default()),
        }
    }

    pub fn settings(&self) -> TrackerSettings {
        *self.settings.read()
    }

    pub fn update_settings(&self, patch: TrackerSettingsPatch) {
        let mut settings = self.settings.write();
        settings.apply(patch);
        debug!("tracker settings updated: {:?}", *settings);
    }

    /// Classifies one block and appends it to the history.
    ///
    /// # Arguments
    /// * `block` - Samples delivered by the capture callback
    /// * `now_ms` - Capture timestamp of the block
    ///
    /// # Returns
    /// * The frame that was stored
    pub fn ingest(&self, block: &SampleBlock<'_>, now_ms: u64) -> RawFrame {
        let settings = self.settings();
        let rms = block.rms();
        let reading = Reading::classify(block, rms, &settings);
        let frame = RawFrame::from_reading(now_ms, reading, rms);
        trace!("ingest {:?}", frame);

        let mut history = self.history.lock();
        if history.latest.map(|f| f.status) != Some(frame.status) {
            debug!("tracker status -> {:?}", frame.status);
        }
        history.push(frame, settings.history_ms());
        frame
    }

    /// Most recent raw frame, if any.
    pub fn latest(&self) -> Option<RawFrame> {
        self.history.lock().latest
    }

    /// Number of frames currently retained.
    pub fn history_len(&self) -> usize {
        self.history.lock().frames.len()
    }

    /// Clears history and the latest frame. Capture is not touched.
    pub fn reset(&self) {
        let mut history = self.history.lock();
        history.frames.clear();
        history.latest = None;
        debug!("tracker reset");
    }

    /// Median-smoothed frame over the trailing smoothing window.
    ///
    /// # Arguments
    /// * `target` - Pitch class the tuning error is measured against
    /// * `now_ms` - Time of the query; frames older than the window are ignored
    pub fn smoothed_frame(&self, target: PitchClass, now_ms: u64) -> SmoothedFrame {
        let window_ms = self.settings().smoothing_window_ms;
        let cutoff = now_ms.saturating_sub(window_ms);
        let (window, latest) = {
            let history = self.history.lock();
            let window: Vec<RawFrame> = history
                .frames
                .iter()
                .filter(|f| f.timestamp_ms >= cutoff)
                .copied()
                .collect();
            (window, history.latest)
        };
        smooth(&window, latest, target, now_ms)
    }
}

/// Median of a non-empty slice. The slice is reordered.
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn smooth(
    window: &[RawFrame],
    latest: Option<RawFrame>,
    target: PitchClass,
    now_ms: u64,
) -> SmoothedFrame {
    let Some(last) = window.last() else {
        return SmoothedFrame {
            timestamp_ms: now_ms,
            status: latest.map(|f| f.status).unwrap_or_default(),
            ..SmoothedFrame::default()
        };
    };

    let valid: Vec<&RawFrame> = window.iter().filter(|f| f.frequency_hz.is_some()).collect();
    if valid.is_empty() {
        return SmoothedFrame {
            timestamp_ms: last.timestamp_ms,
            status: last.status,
            clarity: last.clarity,
            rms: last.rms,
            ..SmoothedFrame::default()
        };
    }

    let mut frequencies: Vec<f32> = valid.iter().filter_map(|f| f.frequency_hz).collect();
    let frequency = median(&mut frequencies);
    let count = valid.len() as f32;
    let clarity = valid.iter().map(|f| f.clarity).sum::<f32>() / count;
    let rms = valid.iter().map(|f| f.rms).sum::<f32>() / count;
    let note_number = tuning::hz_to_note_number(frequency);

    SmoothedFrame {
        timestamp_ms: last.timestamp_ms,
        status: FrameStatus::Listening,
        frequency_hz: Some(frequency),
        clarity,
        rms,
        note_number: Some(note_number),
        pitch_class: Some(PitchClass::from_note_number(note_number)),
        cents_from_target: Some(tuning::cents_from_nearest_target(note_number, target)),
    }
}
