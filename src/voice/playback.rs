//! Audio playback to speakers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use super::pcm::AudioBuffer;
use crate::{Error, Result};

/// Destination for decoded speech
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play the buffer to completion
    ///
    /// # Errors
    ///
    /// Returns error if the output device fails
    async fn play(&self, buffer: AudioBuffer) -> Result<()>;
}

/// Plays audio on the default output device
///
/// The device is opened per buffer on a blocking thread, so the sink can
/// be shared across tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioPlayback;

impl AudioPlayback {
    /// Check that an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self)
    }
}

#[async_trait]
impl AudioSink for AudioPlayback {
    async fn play(&self, buffer: AudioBuffer) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }

        tokio::task::spawn_blocking(move || play_blocking(&buffer))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Find a config at `sample_rate`, preferring mono and falling back to stereo
fn output_config(device: &cpal::Device, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let supports = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
        c.channels() == channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
    };

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| supports(c, 1))
        .or_else(|| {
            device
                .supported_output_configs()
                .ok()?
                .find(|c| supports(c, 2))
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    Ok(supported.with_sample_rate(rate).config())
}

/// Play a mono buffer, duplicating samples across output channels
fn play_blocking(buffer: &AudioBuffer) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let config = output_config(&device, buffer.sample_rate)?;
    let channels = usize::from(config.channels);

    let samples: Arc<[f32]> = buffer.samples.clone().into();
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let pos = position.load(Ordering::Relaxed);
                        let sample = if let Some(&s) = samples.get(pos) {
                            position.store(pos + 1, Ordering::Relaxed);
                            s
                        } else {
                            finished.store(true, Ordering::Relaxed);
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Poll for completion, bounded by the buffer length plus slack
    let timeout = buffer.duration() + Duration::from_millis(500);
    let start = Instant::now();
    while !finished.load(Ordering::Relaxed) {
        if start.elapsed() > timeout {
            tracing::warn!("playback did not finish in time");
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Let the device drain its last period
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = samples.len(), "playback complete");

    Ok(())
}
