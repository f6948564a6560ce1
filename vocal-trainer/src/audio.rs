//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! The callback downmixes to mono, slices the stream into fixed-size
//! blocks and hands each block to the analysis thread over a channel.

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use log::{error, info, warn};

/// Preferred capture rate; the closest supported rate is used otherwise.
pub const PREFERRED_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel for mono blocks of exactly `block_size` samples
/// * `block_size` - Samples per analysis block
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate
/// * `Err(e)` - No device, no usable f32 format, or the stream failed to start
pub fn start_audio_capture(sender: Sender<Vec<f32>>, block_size: usize) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("querying input configs")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, PREFERRED_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = PREFERRED_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels() as usize;
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    info!("Capturing {} channel(s) at {} Hz", channels, sample_rate);

    let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

    // This buffer accumulates mono samples from the callback.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(block_size * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend(
                data.chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );

            while audio_buffer.len() >= block_size {
                let block = audio_buffer[..block_size].to_vec();
                // A full channel means analysis is behind; drop the block.
                if sender.try_send(block).is_err() {
                    warn!("analysis is lagging, dropped a block");
                }
                audio_buffer.drain(..block_size);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input config with the fewest channels whose rate range
/// comes closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_miss = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (c.channels(), rate_miss)
        })
}
