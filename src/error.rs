//! Error types for the Lia companion

use thiserror::Error;

/// Result type alias for Lia operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lia companion
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No API credential configured
    #[error("Gemini API key is missing")]
    MissingCredential,

    /// Language model request or response error
    #[error("language model error: {0}")]
    Llm(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio device or decoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech recognition runtime error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Speech recognition is not available on this host
    #[error("speech recognition is not supported on this system")]
    RecognitionUnavailable,

    /// Another turn is still waiting on the model
    #[error("a turn is already in flight")]
    TurnInProgress,

    /// Image attachment could not be read or parsed
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Base64 decoding error
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}
