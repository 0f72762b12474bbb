//! Energy-based utterance segmentation
//!
//! Splits a continuous microphone stream into utterances: speech starts
//! when RMS energy crosses a threshold and ends after a run of silence.

use super::capture::{CAPTURE_SAMPLE_RATE, rms};

/// Minimum RMS energy counted as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Shortest utterance worth transcribing (0.3 s)
const MIN_SPEECH_SAMPLES: usize = CAPTURE_SAMPLE_RATE as usize * 3 / 10;

/// Silence that ends an utterance (0.7 s)
const END_SILENCE_SAMPLES: usize = CAPTURE_SAMPLE_RATE as usize * 7 / 10;

/// Hard cap on utterance length (30 s)
const MAX_UTTERANCE_SAMPLES: usize = CAPTURE_SAMPLE_RATE as usize * 30;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Quiet,
    /// Accumulating an utterance
    Speaking,
}

/// Turns blocks of samples into complete utterances
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    utterance: Vec<f32>,
    voiced_samples: usize,
    silence: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Quiet,
            utterance: Vec::new(),
            voiced_samples: 0,
            silence: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Feed a block of samples
    ///
    /// Returns the finished utterance once trailing silence closes it.
    /// Utterances with too little voiced audio are dropped.
    pub fn push(&mut self, block: &[f32]) -> Option<Vec<f32>> {
        if block.is_empty() {
            return None;
        }

        let energy = rms(block);
        let voiced = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Quiet => {
                if voiced {
                    tracing::trace!(energy, "speech started");
                    self.state = SegmenterState::Speaking;
                    self.utterance.clear();
                    self.utterance.extend_from_slice(block);
                    self.voiced_samples = block.len();
                    self.silence = 0;
                }
                None
            }
            SegmenterState::Speaking => {
                self.utterance.extend_from_slice(block);
                if voiced {
                    self.voiced_samples += block.len();
                    self.silence = 0;
                } else {
                    self.silence += block.len();
                }

                let closed = self.silence > END_SILENCE_SAMPLES
                    || self.utterance.len() >= MAX_UTTERANCE_SAMPLES;
                if !closed {
                    return None;
                }

                let utterance = std::mem::take(&mut self.utterance);
                let voiced_samples = self.voiced_samples;
                self.reset();

                if voiced_samples < MIN_SPEECH_SAMPLES {
                    tracing::trace!(voiced_samples, "utterance too short, dropped");
                    return None;
                }

                tracing::debug!(samples = utterance.len(), "utterance complete");
                Some(utterance)
            }
        }
    }

    /// Discard any partial utterance
    pub fn reset(&mut self) {
        self.state = SegmenterState::Quiet;
        self.utterance.clear();
        self.voiced_samples = 0;
        self.silence = 0;
    }
}
