//! Speech output pipeline
//!
//! text → clean → synthesize → decode → play. Failures at any stage are
//! logged and swallowed: speech is best-effort and never reaches the user
//! as an error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::pcm::decode_pcm16;
use super::playback::AudioSink;
use super::tts::{SpeechSynthesizer, clean_for_speech};
use crate::Result;

/// Speaks assistant text aloud
pub struct SpeechOutput {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    char_limit: usize,
    /// Utterances currently in the pipeline
    speaking: AtomicUsize,
}

impl SpeechOutput {
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        char_limit: usize,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            char_limit,
            speaking: AtomicUsize::new(0),
        }
    }

    /// Whether any speech is being synthesized or played
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst) > 0
    }

    /// Speak `text`, returning whether audio was played
    ///
    /// Text that is empty after cleaning is a no-op.
    pub async fn speak(&self, text: &str) -> bool {
        let cleaned = clean_for_speech(text, self.char_limit);
        if cleaned.is_empty() {
            return false;
        }

        let _speaking = SpeakingGuard::enter(&self.speaking);
        match self.speak_cleaned(&cleaned).await {
            Ok(played) => played,
            Err(e) => {
                tracing::warn!(error = %e, "speech output failed");
                false
            }
        }
    }

    /// Speak on a background task without waiting for playback
    pub fn speak_detached(self: &Arc<Self>, text: String) -> JoinHandle<bool> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.speak(&text).await })
    }

    async fn speak_cleaned(&self, cleaned: &str) -> Result<bool> {
        tracing::debug!(chars = cleaned.chars().count(), "synthesizing speech");

        let Some(payload) = self.synthesizer.synthesize(cleaned).await? else {
            tracing::debug!("synthesizer returned no audio");
            return Ok(false);
        };

        let buffer = decode_pcm16(&payload)?;
        tracing::debug!(
            samples = buffer.samples.len(),
            duration_ms = buffer.duration().as_millis(),
            "playing speech"
        );

        self.sink.play(buffer).await?;
        Ok(true)
    }
}

/// Holds the speaking count up until dropped, even if the task is aborted
struct SpeakingGuard<'a>(&'a AtomicUsize);

impl<'a> SpeakingGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for SpeakingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
