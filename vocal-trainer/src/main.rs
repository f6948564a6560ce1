//! # Vocal Trainer - console front end
//!
//! Listens to the default microphone and coaches the singer onto a target
//! pitch class in whatever octave suits their voice.
//!
//! ## Architecture
//! - **Audio Thread**: owns the CPAL stream and feeds every block to the tracker
//! - **Main Thread**: refresh loop that queries the tracker and drives the session
//! - **Communication**: crossbeam channels for blocks, readiness and shutdown
//!
//! Usage: `vocal-trainer <NOTE> [CONFIG.json]`, e.g. `vocal-trainer F#`.

mod audio;
mod config;
mod meter;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::{Receiver, Sender, select};
use log::{debug, error, info};
use vocal_core::tuning::{self, PitchClass};
use vocal_core::{PracticeSession, SampleBlock, Tracker};

use config::TrainerConfig;

/// Blocks queued between the capture callback and analysis.
const BLOCK_QUEUE: usize = 8;

/// Handle to the dedicated audio thread.
struct AudioWorker {
    shutdown_tx: Sender<()>,
    /// Disconnects when the audio thread exits.
    done_rx: Receiver<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Spawns the audio thread and waits until capture is running.
    ///
    /// The stream is created on the audio thread itself because CPAL
    /// streams are not `Send` on every platform.
    fn start(tracker: Arc<Tracker>, clock: Instant, block_size: usize) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32>>(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        let thread_handle = thread::spawn(move || {
            let _done = done_tx;
            let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(BLOCK_QUEUE);
            let (stream, sample_rate) = match audio::start_audio_capture(raw_audio_tx, block_size) {
                Ok(tuple) => tuple,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(sample_rate));

            loop {
                select! {
                    recv(raw_audio_rx) -> msg => match msg {
                        Ok(samples) => {
                            let now_ms = clock.elapsed().as_millis() as u64;
                            tracker.ingest(&SampleBlock::new(&samples, sample_rate), now_ms);
                        }
                        Err(_) => {
                            error!("audio channel closed");
                            break;
                        }
                    },
                    recv(shutdown_rx) -> _ => {
                        debug!("audio thread received shutdown signal");
                        break;
                    },
                }
            }

            drop(stream);
            debug!("audio thread finished");
        });

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| anyhow!("audio thread exited before capture started"))??;
        info!("capture running at {} Hz", sample_rate);

        Ok(Self {
            shutdown_tx,
            done_rx,
            thread_handle: Some(thread_handle),
        })
    }

    fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("audio thread panicked");
            }
        }
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn parse_args() -> Result<(PitchClass, Option<PathBuf>)> {
    let mut args = env::args().skip(1);
    let Some(note) = args.next() else {
        bail!("usage: vocal-trainer <NOTE> [CONFIG.json]");
    };
    let target = tuning::parse_pitch_class(&note).with_context(|| format!("target note {note:?}"))?;
    Ok((target, args.next().map(PathBuf::from)))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (target, config_path) = parse_args()?;
    let config = TrainerConfig::load(config_path.as_deref())?;
    info!("target {}, config {:?}", target, config);

    let clock = Instant::now();
    let tracker = Arc::new(Tracker::new(config.tracker));
    let worker = AudioWorker::start(Arc::clone(&tracker), clock, config.block_size)?;
    let mut session = PracticeSession::new(target, config.session);

    let ticker = crossbeam_channel::tick(Duration::from_secs_f32(1.0 / config.refresh_hz));
    let mut stdout = io::stdout();
    println!("Sing {} in any octave. Ctrl-C to quit.", target);

    loop {
        select! {
            recv(ticker) -> _ => {
                let now_ms = clock.elapsed().as_millis() as u64;
                let feedback = session.tick(&tracker, now_ms)?;

                write!(stdout, "\r{}", meter::render(&feedback))?;
                if let Some(s) = feedback.suggestion {
                    let direction = if s.semitones_to_target > 0 { "up" } else { "down" };
                    writeln!(
                        stdout,
                        "\nYou are singing {}. Move {} {} semitone(s) to reach {}.",
                        s.sung,
                        direction,
                        s.semitones_to_target.abs(),
                        s.target
                    )?;
                }
                if feedback.hold.just_succeeded {
                    writeln!(stdout, "\nNice! {} held.", target)?;
                }
                stdout.flush()?;
            },
            recv(worker.done_rx) -> _ => {
                bail!("audio thread stopped unexpectedly");
            },
        }
    }
}
