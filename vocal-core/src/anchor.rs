//! # Octave Anchor
//!
//! Chooses which absolute octave of the target pitch class the display is
//! drawn against, and keeps that choice stable while the singer hovers
//! near the midpoint between two octaves.

use log::debug;

use crate::error::{PitchError, Result};
use crate::tuning::PitchClass;
use crate::voice_range::VoiceRange;

/// An established anchor only moves when another candidate is this much
/// closer to the detected pitch (in semitones).
pub const ANCHOR_HYSTERESIS_SEMITONES: f32 = 2.8;

/// Every note number in `range` whose pitch class is `target`, ascending.
pub fn candidates(target: PitchClass, range: VoiceRange) -> impl Iterator<Item = i32> {
    (range.min_note..=range.max_note).filter(move |&n| PitchClass::from_note(n) == target)
}

/// Picks the reference note number for the current frame.
///
/// # Arguments
/// * `detected` - Fractional note number of the sung pitch
/// * `target` - Target pitch class
/// * `range` - Inclusive voice-range window
/// * `previous` - Anchor held from the previous frame, if any
///
/// # Returns
/// * The anchor note number. When `range` holds no octave of `target` the
///   octave-equivalent nearest to `detected` is returned.
/// * `Err` when `detected` is not finite.
pub fn resolve_anchor(
    detected: f32,
    target: PitchClass,
    range: VoiceRange,
    previous: Option<i32>,
) -> Result<i32> {
    if !detected.is_finite() {
        return Err(PitchError::NonFinite("detected note number"));
    }
    let distance = |note: i32| (note as f32 - detected).abs();

    let best = candidates(target, range).min_by(|a, b| distance(*a).total_cmp(&distance(*b)));
    let Some(best) = best else {
        return Ok(crate::tuning::nearest_target_note_number(detected, target));
    };

    match previous {
        Some(anchor) if range.contains(anchor) && PitchClass::from_note(anchor) == target => {
            if distance(anchor) - distance(best) > ANCHOR_HYSTERESIS_SEMITONES {
                Ok(best)
            } else {
                Ok(anchor)
            }
        }
        _ => Ok(best),
    }
}

/// Signed display offset of the sung pitch from the anchor, in cents.
pub fn cents_from_anchor(detected: f32, anchor: i32) -> f32 {
    (detected - anchor as f32) * 100.0
}

/// Caller-held anchor that clears itself when the target or range changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OctaveAnchor {
    anchor: Option<i32>,
    key: Option<(PitchClass, VoiceRange)>,
}

impl OctaveAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<i32> {
        self.anchor
    }

    pub fn reset(&mut self) {
        self.anchor = None;
        self.key = None;
    }

    /// Resolves and stores the anchor for this frame.
    pub fn update(&mut self, detected: f32, target: PitchClass, range: VoiceRange) -> Result<i32> {
        if self.key != Some((target, range)) {
            if self.anchor.is_some() {
                debug!("octave anchor cleared: target {} range {:?}", target, range);
            }
            self.anchor = None;
            self.key = Some((target, range));
        }
        let next = resolve_anchor(detected, target, range, self.anchor)?;
        if self.anchor.is_some_and(|a| a != next) {
            debug!("octave anchor moved {:?} -> {}", self.anchor, next);
        }
        self.anchor = Some(next);
        Ok(next)
    }
}
