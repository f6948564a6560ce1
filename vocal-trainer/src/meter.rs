//! # Console Cent Meter
//!
//! Renders one [`Feedback`] as a single terminal line: a needle showing
//! the tuning error, the anchor note, the status and the hold progress.

use vocal_core::tracker::FrameStatus;
use vocal_core::tuning;
use vocal_core::Feedback;

/// The meter shows deviations from -50 to +50 cents.
const METER_RANGE: f32 = 50.0;

/// Character cells across the needle track (odd, so there is a centre).
const METER_WIDTH: usize = 41;

const PROGRESS_WIDTH: usize = 10;

/// Needle track for a tuning error, `None` draws an empty track.
pub fn needle(cents: Option<f32>) -> String {
    let centre = METER_WIDTH / 2;
    let pos = cents.map(|c| {
        let clamped = c.clamp(-METER_RANGE, METER_RANGE);
        (((clamped + METER_RANGE) / (2.0 * METER_RANGE)) * (METER_WIDTH - 1) as f32).round() as usize
    });
    (0..METER_WIDTH)
        .map(|i| match pos {
            Some(p) if p == i => accuracy_mark(cents.unwrap_or_default()),
            _ if i == centre => '|',
            _ => '-',
        })
        .collect()
}

/// Green/yellow/red zones of the graphical meter, as characters.
fn accuracy_mark(cents: f32) -> char {
    if cents.abs() < 5.0 {
        '@'
    } else if cents.abs() < 20.0 {
        'o'
    } else {
        'x'
    }
}

fn progress_bar(progress: f32) -> String {
    let filled = (progress.clamp(0.0, 1.0) * PROGRESS_WIDTH as f32).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(PROGRESS_WIDTH - filled))
}

fn status_label(status: FrameStatus) -> &'static str {
    match status {
        FrameStatus::Idle => "waiting",
        FrameStatus::Listening => "listening",
        FrameStatus::TooQuiet => "too quiet",
        FrameStatus::NoPitch => "no pitch",
        FrameStatus::LowConfidence => "unclear",
    }
}

/// Full status line for one refresh.
pub fn render(feedback: &Feedback) -> String {
    let anchor = feedback
        .anchor_note
        .map(tuning::note_name)
        .unwrap_or_else(|| "--".to_string());
    let cents = feedback
        .tuning_cents
        .map(|c| format!("{:+4.0}c", c))
        .unwrap_or_else(|| "   --".to_string());
    let sung = feedback
        .sung_pitch_class
        .map(|pc| pc.name())
        .unwrap_or("-");
    format!(
        "[{}] {:>4} sung {:<2} {} {:<9} hold [{}]",
        needle(feedback.tuning_cents),
        anchor,
        sung,
        cents,
        status_label(feedback.status),
        progress_bar(feedback.hold.progress),
    )
}
