// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timebase driven by an audio output stream (cpal).
//!
//! The stream renders silence; its callback counts frames. Time is the
//! frame position of the latest buffer plus the time elapsed since that
//! callback, capped at one buffer, so reads between callbacks stay smooth
//! and never run ahead of the device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{info, warn};

use crate::error::{Result, SequencerError};
use crate::timing::Timebase;

#[derive(Debug, Default)]
struct ClockState {
    /// Frame position at the start of the latest buffer
    frames: AtomicU64,
    /// Frames in the latest buffer
    buffer_frames: AtomicU64,
    /// Nanoseconds since `origin` when the latest callback ran
    callback_nanos: AtomicU64,
    /// Largest value handed out, as f64 bits
    last_read: AtomicU64,
}

/// Hardware clock read from the default output device
pub struct AudioClock {
    _stream: Stream,
    state: Arc<ClockState>,
    origin: Instant,
    sample_rate: u32,
}

impl AudioClock {
    /// Open the default output device and start counting frames
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SequencerError::AudioClock("no output device available".to_string()))?;

        let supported = device.default_output_config().map_err(|e| {
            SequencerError::AudioClock(format!("failed to get default config: {}", e))
        })?;
        let sample_format = supported.sample_format();
        let config = supported.config();
        let sample_rate = config.sample_rate.0;

        let state = Arc::new(ClockState::default());
        let origin = Instant::now();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, &state, origin),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, &state, origin),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, &state, origin),
            other => Err(SequencerError::AudioClock(format!(
                "unsupported sample format {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| SequencerError::AudioClock(format!("failed to start stream: {}", e)))?;

        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            "audio clock running"
        );

        Ok(Self {
            _stream: stream,
            state,
            origin,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Timebase for AudioClock {
    fn now(&self) -> f64 {
        let frames = self.state.frames.load(Ordering::Acquire);
        let buffer_frames = self.state.buffer_frames.load(Ordering::Acquire);
        let callback_nanos = self.state.callback_nanos.load(Ordering::Acquire);
        let elapsed_nanos = self.origin.elapsed().as_nanos() as u64;
        let since = elapsed_nanos.saturating_sub(callback_nanos) as f64 / 1e9;

        let time = interpolate(frames, buffer_frames, since, self.sample_rate);
        // non-negative f64 bit patterns order the same as the values
        let previous = self
            .state
            .last_read
            .fetch_max(time.to_bits(), Ordering::AcqRel);
        f64::from_bits(previous.max(time.to_bits()))
    }
}

/// Seconds at `frames` plus `since`, never past the end of the current buffer
fn interpolate(frames: u64, buffer_frames: u64, since: f64, sample_rate: u32) -> f64 {
    let rate = sample_rate.max(1) as f64;
    let buffer = buffer_frames as f64 / rate;
    frames as f64 / rate + since.clamp(0.0, buffer)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    state: &Arc<ClockState>,
    origin: Instant,
) -> Result<Stream>
where
    T: SizedSample,
{
    let channels = config.channels.max(1) as usize;
    let state = Arc::clone(state);
    let mut position: u64 = 0;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                data.fill(T::EQUILIBRIUM);
                let frames = (data.len() / channels) as u64;
                state.frames.store(position, Ordering::Release);
                state.buffer_frames.store(frames, Ordering::Release);
                state
                    .callback_nanos
                    .store(origin.elapsed().as_nanos() as u64, Ordering::Release);
                position += frames;
            },
            move |err| {
                warn!("audio clock stream error: {}", err);
            },
            None,
        )
        .map_err(|e| SequencerError::AudioClock(format!("failed to build stream: {}", e)))
}
