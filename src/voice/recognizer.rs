//! Continuous speech recognition
//!
//! [`Recognizer`] is the platform capability the speech input state
//! machine drives. [`CaptureRecognizer`] implements it with the microphone,
//! energy segmentation and remote transcription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::capture::{CAPTURE_SAMPLE_RATE, MicCapture, samples_to_wav};
use super::segmenter::{SegmenterState, UtteranceSegmenter};
use crate::llm::Transcriber;
use crate::{Error, Result};

/// Identifies one recognition session
pub type SessionId = u64;

/// How often the capture thread drains the microphone
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Placeholder interim text while an utterance is being heard
pub const HEARING_PLACEHOLDER: &str = "…";

/// One recognition hypothesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    #[must_use]
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    #[must_use]
    pub fn final_(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// What happened in a recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEventKind {
    /// New or updated results, starting at `result_index`
    Results {
        results: Vec<RecognitionResult>,
        result_index: usize,
    },
    /// The session failed; an `End` follows
    Error(String),
    /// The session ended
    End,
}

/// Event tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEvent {
    pub session: SessionId,
    pub kind: RecognitionEventKind,
}

/// A continuous, interim-result-capable recognition capability
pub trait Recognizer: Send {
    /// Whether recognition can run on this host
    fn is_available(&self) -> bool;

    /// Start (or restart) a session
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be started
    fn start(&mut self, session: SessionId, language: &str) -> Result<()>;

    /// Stop the active session; its `End` event may arrive later
    fn stop(&mut self);
}

struct ActiveCapture {
    session: SessionId,
    stop: Arc<AtomicBool>,
}

/// Microphone-backed recognizer
///
/// Each session runs on its own thread: it captures audio, cuts it into
/// utterances and transcribes each one as a single final result.
pub struct CaptureRecognizer {
    transcriber: Arc<dyn Transcriber>,
    has_credential: bool,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    runtime: tokio::runtime::Handle,
    active: Option<ActiveCapture>,
}

impl CaptureRecognizer {
    /// Create a recognizer and the receiver for its events
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        has_credential: bool,
    ) -> (Self, mpsc::UnboundedReceiver<RecognitionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let recognizer = Self {
            transcriber,
            has_credential,
            events,
            runtime: tokio::runtime::Handle::current(),
            active: None,
        };
        (recognizer, rx)
    }
}

impl Recognizer for CaptureRecognizer {
    fn is_available(&self) -> bool {
        self.has_credential && MicCapture::is_available()
    }

    fn start(&mut self, session: SessionId, language: &str) -> Result<()> {
        if !self.is_available() {
            return Err(Error::RecognitionUnavailable);
        }
        self.stop();

        let stop = Arc::new(AtomicBool::new(false));
        let worker = CaptureWorker {
            session,
            language: language.to_string(),
            stop: Arc::clone(&stop),
            transcriber: Arc::clone(&self.transcriber),
            events: self.events.clone(),
            runtime: self.runtime.clone(),
        };

        std::thread::Builder::new()
            .name(format!("lia-recognizer-{session}"))
            .spawn(move || worker.run())?;

        tracing::debug!(session, language, "recognition session started");
        self.active = Some(ActiveCapture { session, stop });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.store(true, Ordering::SeqCst);
            tracing::debug!(session = active.session, "recognition session stopping");
        }
    }
}

impl Drop for CaptureRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureWorker {
    session: SessionId,
    language: String,
    stop: Arc<AtomicBool>,
    transcriber: Arc<dyn Transcriber>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    runtime: tokio::runtime::Handle,
}

impl CaptureWorker {
    fn send(&self, kind: RecognitionEventKind) {
        // Receiver gone means the front end shut down
        let _ = self.events.send(RecognitionEvent {
            session: self.session,
            kind,
        });
    }

    fn run(self) {
        if let Err(e) = self.capture_loop() {
            tracing::warn!(session = self.session, error = %e, "recognition session failed");
            self.send(RecognitionEventKind::Error(e.to_string()));
        }
        self.send(RecognitionEventKind::End);
    }

    fn capture_loop(&self) -> Result<()> {
        let mut mic = MicCapture::new()?;
        mic.start()?;
        let mut segmenter = UtteranceSegmenter::new();

        while !self.stop.load(Ordering::SeqCst) {
            std::thread::sleep(POLL_INTERVAL);

            let was_quiet = segmenter.state() == SegmenterState::Quiet;
            let block = mic.take_buffer();
            let utterance = segmenter.push(&block);

            if was_quiet && segmenter.state() == SegmenterState::Speaking {
                self.send(RecognitionEventKind::Results {
                    results: vec![RecognitionResult::interim(HEARING_PLACEHOLDER)],
                    result_index: 0,
                });
            }

            let Some(utterance) = utterance else {
                continue;
            };

            let wav = samples_to_wav(&utterance, CAPTURE_SAMPLE_RATE)?;
            let transcript = self
                .runtime
                .block_on(self.transcriber.transcribe(wav, &self.language))?;

            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            if transcript.is_empty() {
                continue;
            }

            self.send(RecognitionEventKind::Results {
                results: vec![RecognitionResult::final_(transcript)],
                result_index: 0,
            });
        }

        mic.stop();
        Ok(())
    }
}
