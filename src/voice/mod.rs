//! Voice input and output
//!
//! Output: cleaned text goes through remote TTS, the PCM16 payload is
//! decoded and played. Input: microphone capture is segmented into
//! utterances, transcribed, and fed through the dictation and wake-word
//! state machine.

mod capture;
mod input;
mod output;
mod pcm;
mod playback;
mod recognizer;
mod segmenter;
mod tts;

pub use capture::{CAPTURE_SAMPLE_RATE, MicCapture, rms, samples_to_wav};
pub use input::{InputEffect, ListenMode, SpeechInput, SpeechInputSettings, WAKE_ACKNOWLEDGEMENT};
pub use output::SpeechOutput;
pub use pcm::{AudioBuffer, TTS_SAMPLE_RATE, decode_pcm16, pcm16_to_buffer};
pub use playback::{AudioPlayback, AudioSink};
pub use recognizer::{
    CaptureRecognizer, HEARING_PLACEHOLDER, RecognitionEvent, RecognitionEventKind,
    RecognitionResult, Recognizer, SessionId,
};
pub use segmenter::{SegmenterState, UtteranceSegmenter};
pub use tts::{DEFAULT_SPEECH_CHAR_LIMIT, SpeechSynthesizer, clean_for_speech};
