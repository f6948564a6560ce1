use std::f32::consts::PI;

use vocal_core::session::{PracticeSession, SessionConfig};
use vocal_core::tracker::{FrameStatus, Tracker, TrackerSettings};
use vocal_core::tuning::{self, PitchClass};
use vocal_core::voice_range::{VoicePart, VoiceRangeMode};
use vocal_core::SampleBlock;

const SR: u32 = 44100;
const BLOCK: usize = 2048;
const BLOCK_MS: u64 = 46;

fn sine_block(freq: f32, amplitude: f32, offset: usize) -> Vec<f32> {
    (offset..offset + BLOCK)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SR as f32).sin())
        .collect()
}

#[test]
fn sung_octave_below_target_is_held_to_success() {
    let tracker = Tracker::new(TrackerSettings::default());
    let target = tuning::parse_pitch_class("A").unwrap();
    let config = SessionConfig {
        hold_duration_ms: 1000,
        voice_range: VoiceRangeMode::Manual(VoicePart::Lower),
        ..SessionConfig::default()
    };
    let mut session = PracticeSession::new(target, config);

    // A3 (220 Hz): an octave below A4, still the target pitch class.
    let mut successes = 0;
    let mut last = None;
    for i in 0..40u64 {
        let now = i * BLOCK_MS;
        let samples = sine_block(220.0, 0.3, i as usize * BLOCK);
        tracker.ingest(&SampleBlock::new(&samples, SR), now);
        let fb = session.tick(&tracker, now).unwrap();
        if fb.hold.just_succeeded {
            successes += 1;
        }
        last = Some(fb);
    }

    let fb = last.unwrap();
    assert_eq!(successes, 1);
    assert!(fb.hold.success);
    assert!(fb.in_tune);
    assert_eq!(fb.status, FrameStatus::Listening);
    assert_eq!(fb.anchor_note, Some(57));
    assert_eq!(fb.sung_pitch_class, Some(target));
    assert!(fb.tuning_cents.unwrap().abs() < 10.0);
}

#[test]
fn silence_interrupts_the_hold() {
    let tracker = Tracker::default();
    let target = PitchClass::new(9).unwrap();
    let mut session = PracticeSession::new(
        target,
        SessionConfig {
            hold_duration_ms: 2000,
            ..SessionConfig::default()
        },
    );

    for i in 0..10u64 {
        let samples = sine_block(440.0, 0.3, i as usize * BLOCK);
        tracker.ingest(&SampleBlock::new(&samples, SR), i * BLOCK_MS);
        session.tick(&tracker, i * BLOCK_MS).unwrap();
    }

    let silence = vec![0.0; BLOCK];
    let mut fb = None;
    for i in 10..20u64 {
        tracker.ingest(&SampleBlock::new(&silence, SR), i * BLOCK_MS);
        fb = Some(session.tick(&tracker, i * BLOCK_MS).unwrap());
    }
    let fb = fb.unwrap();
    assert_eq!(fb.status, FrameStatus::TooQuiet);
    assert_eq!(fb.hold.elapsed_ms, 0);
    assert!(!fb.hold.success);
}

#[test]
fn wrong_pitch_class_is_never_in_tune() {
    let tracker = Tracker::default();
    let target = PitchClass::new(0).unwrap();
    let mut session = PracticeSession::new(target, SessionConfig::default());
    for i in 0..30u64 {
        // E4
        let samples = sine_block(329.63, 0.3, i as usize * BLOCK);
        tracker.ingest(&SampleBlock::new(&samples, SR), i * BLOCK_MS);
        let fb = session.tick(&tracker, i * BLOCK_MS).unwrap();
        assert!(!fb.in_tune);
        assert!(!fb.hold.success);
    }
}
