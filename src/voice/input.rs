//! Speech input state machine
//!
//! Drives a [`Recognizer`] in one of two modes: manual dictation, which
//! yields a single transcript, and passive wake-word listening, which
//! restarts itself until the wake word is heard.

use std::time::Duration;

use super::recognizer::{RecognitionEvent, RecognitionEventKind, RecognitionResult, Recognizer, SessionId};
use crate::{Error, Result};

/// Spoken acknowledgement after the wake word
pub const WAKE_ACKNOWLEDGEMENT: &str = "Yes, madam? I'm listening.";

/// Which recognition mode is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    Idle,
    Dictating,
    WakeListening,
}

/// What the driver should do after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEffect {
    /// Nothing to do
    None,
    /// Partial dictation text to display
    Interim(String),
    /// Final dictation text to send as a user turn
    Transcript(String),
    /// Speak the acknowledgement, then call `begin_dictation` after the delay
    WakeWordHeard {
        acknowledgement: &'static str,
        resume_after: Duration,
    },
    /// Wake listening ended on its own and was restarted
    Restarted,
    /// The active mode ended without a transcript
    Reset,
}

/// Speech input settings
#[derive(Debug, Clone)]
pub struct SpeechInputSettings {
    /// Token that triggers dictation, matched case-insensitively
    pub wake_word: String,
    /// BCP 47 language tag
    pub language: String,
    /// Delay between the acknowledgement and dictation
    pub resume_after: Duration,
}

impl Default for SpeechInputSettings {
    fn default() -> Self {
        Self {
            wake_word: "lia".to_string(),
            language: "en-US".to_string(),
            resume_after: Duration::from_millis(1000),
        }
    }
}

/// Two-mode speech input over a recognizer
pub struct SpeechInput<R> {
    recognizer: R,
    settings: SpeechInputSettings,
    mode: ListenMode,
    /// Session whose events are currently accepted
    session: Option<SessionId>,
    next_session: SessionId,
    interim: String,
}

impl<R: Recognizer> SpeechInput<R> {
    #[must_use]
    pub fn new(recognizer: R, settings: SpeechInputSettings) -> Self {
        Self {
            recognizer,
            settings: SpeechInputSettings {
                wake_word: settings.wake_word.to_lowercase(),
                ..settings
            },
            mode: ListenMode::Idle,
            session: None,
            next_session: 1,
            interim: String::new(),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> ListenMode {
        self.mode
    }

    /// Interim dictation text heard so far
    #[must_use]
    pub fn interim(&self) -> &str {
        &self.interim
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.recognizer.is_available()
    }

    #[must_use]
    pub const fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Start dictation, or stop it if it is running
    ///
    /// # Errors
    ///
    /// Returns error if recognition is unavailable or fails to start
    pub fn toggle_dictation(&mut self) -> Result<ListenMode> {
        if self.mode == ListenMode::Dictating {
            self.deactivate();
            return Ok(self.mode);
        }
        self.activate(ListenMode::Dictating)?;
        Ok(self.mode)
    }

    /// Start wake-word listening, or stop it if it is running
    ///
    /// # Errors
    ///
    /// Returns error if recognition is unavailable or fails to start
    pub fn toggle_wake_listening(&mut self) -> Result<ListenMode> {
        if self.mode == ListenMode::WakeListening {
            self.deactivate();
            return Ok(self.mode);
        }
        self.activate(ListenMode::WakeListening)?;
        Ok(self.mode)
    }

    /// Start dictation after the wake word, unless another mode took over
    ///
    /// Returns whether dictation started.
    ///
    /// # Errors
    ///
    /// Returns error if recognition is unavailable or fails to start
    pub fn begin_dictation(&mut self) -> Result<bool> {
        if self.mode != ListenMode::Idle {
            tracing::debug!(mode = ?self.mode, "skipping dictation resume");
            return Ok(false);
        }
        self.activate(ListenMode::Dictating)?;
        Ok(true)
    }

    /// Stop whatever is running
    pub fn stop(&mut self) {
        if self.mode != ListenMode::Idle {
            self.deactivate();
        }
    }

    fn activate(&mut self, mode: ListenMode) -> Result<()> {
        if !self.recognizer.is_available() {
            return Err(Error::RecognitionUnavailable);
        }
        if self.mode != ListenMode::Idle {
            self.deactivate();
        }

        let session = self.next_session;
        self.next_session += 1;
        self.recognizer.start(session, &self.settings.language)?;

        tracing::info!(session, ?mode, "speech input started");
        self.session = Some(session);
        self.mode = mode;
        self.interim.clear();
        Ok(())
    }

    fn deactivate(&mut self) {
        self.recognizer.stop();
        tracing::info!(session = ?self.session, mode = ?self.mode, "speech input stopped");
        self.reset();
    }

    fn reset(&mut self) {
        self.mode = ListenMode::Idle;
        self.session = None;
        self.interim.clear();
    }

    /// Apply a recognizer event
    pub fn handle(&mut self, event: RecognitionEvent) -> InputEffect {
        if self.session != Some(event.session) {
            tracing::trace!(session = event.session, "ignoring event from stale session");
            return InputEffect::None;
        }

        match self.mode {
            ListenMode::Idle => InputEffect::None,
            ListenMode::Dictating => self.handle_dictation(event.kind),
            ListenMode::WakeListening => self.handle_wake(event.session, event.kind),
        }
    }

    fn handle_dictation(&mut self, kind: RecognitionEventKind) -> InputEffect {
        match kind {
            RecognitionEventKind::Results {
                results,
                result_index,
            } => {
                let (finals, interims): (Vec<&RecognitionResult>, Vec<&RecognitionResult>) =
                    results.iter().skip(result_index).partition(|r| r.is_final);

                let transcript = join(&finals);
                if !transcript.is_empty() {
                    self.deactivate();
                    return InputEffect::Transcript(transcript);
                }

                let interim = join(&interims);
                if interim.is_empty() {
                    return InputEffect::None;
                }
                self.interim.clone_from(&interim);
                InputEffect::Interim(interim)
            }
            RecognitionEventKind::Error(message) => {
                tracing::warn!(error = %message, "dictation failed");
                self.recognizer.stop();
                self.reset();
                InputEffect::Reset
            }
            RecognitionEventKind::End => {
                self.reset();
                InputEffect::Reset
            }
        }
    }

    fn handle_wake(&mut self, session: SessionId, kind: RecognitionEventKind) -> InputEffect {
        match kind {
            RecognitionEventKind::Results { results, .. } => {
                let heard = results.last().is_some_and(|r| {
                    r.is_final && r.transcript.to_lowercase().contains(&self.settings.wake_word)
                });
                if !heard {
                    return InputEffect::None;
                }

                tracing::info!(wake_word = %self.settings.wake_word, "wake word detected");
                self.deactivate();
                InputEffect::WakeWordHeard {
                    acknowledgement: WAKE_ACKNOWLEDGEMENT,
                    resume_after: self.settings.resume_after,
                }
            }
            RecognitionEventKind::Error(message) => {
                // Restarting after a hard failure would spin
                tracing::warn!(error = %message, "wake listening failed");
                self.recognizer.stop();
                self.reset();
                InputEffect::Reset
            }
            RecognitionEventKind::End => match self.recognizer.start(session, &self.settings.language) {
                Ok(()) => {
                    tracing::debug!(session, "wake listening restarted");
                    InputEffect::Restarted
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to restart wake listening");
                    self.reset();
                    InputEffect::Reset
                }
            },
        }
    }
}

fn join(results: &[&RecognitionResult]) -> String {
    results
        .iter()
        .map(|r| r.transcript.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
