//! Raw PCM decoding for synthesized speech

use base64::Engine as _;

use crate::{Error, Result};

/// Sample rate of synthesized speech
pub const TTS_SAMPLE_RATE: u32 = 24000;

/// Mono floating point audio ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    /// Mono buffer at the given sample rate
    #[must_use]
    pub const fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> std::time::Duration {
        let frames = self.samples.len() / usize::from(self.channels.max(1));
        std::time::Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }
}

/// Decode base64 little-endian 16-bit PCM into a 24 kHz mono buffer
///
/// # Errors
///
/// Returns error if the payload is not base64 or has an odd byte count
pub fn decode_pcm16(payload: &str) -> Result<AudioBuffer> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    pcm16_to_buffer(&bytes, TTS_SAMPLE_RATE)
}

/// Convert little-endian 16-bit PCM bytes into normalized samples
///
/// # Errors
///
/// Returns error if the byte count is odd
pub fn pcm16_to_buffer(bytes: &[u8], sample_rate: u32) -> Result<AudioBuffer> {
    if bytes.len() % 2 != 0 {
        return Err(Error::Audio(format!(
            "PCM payload has odd length {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(AudioBuffer::mono(samples, sample_rate))
}
