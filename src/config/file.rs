//! TOML configuration file loading
//!
//! Supports `~/.config/lia/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct LiaConfigFile {
    #[serde(default)]
    pub gemini: GeminiFileConfig,

    #[serde(default)]
    pub voice: VoiceFileConfig,

    #[serde(default)]
    pub conversation: ConversationFileConfig,

    #[serde(default)]
    pub phone: PhoneFileConfig,

    #[serde(default)]
    pub ambient: AmbientFileConfig,
}

/// Gemini API configuration
#[derive(Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    /// API key (`GEMINI_API_KEY` takes precedence)
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub chat_model: Option<String>,
    pub tts_model: Option<String>,
    pub transcription_model: Option<String>,
    /// Prebuilt voice name (e.g. "Zephyr")
    pub tts_voice: Option<String>,
}

/// Speech input and output configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Speak assistant replies
    pub audio_enabled: Option<bool>,
    pub wake_word: Option<String>,
    /// BCP 47 recognition language (e.g. "en-US")
    pub language: Option<String>,
    /// Delay between the wake acknowledgement and dictation
    pub wake_resume_ms: Option<u64>,
    pub speech_char_limit: Option<usize>,
}

/// Turn handling configuration
#[derive(Debug, Default, Deserialize)]
pub struct ConversationFileConfig {
    /// "unbounded", "sliding" or "compact"
    pub context: Option<String>,
    pub max_messages: Option<usize>,
    pub compact_fraction: Option<f64>,
    /// "queue" or "reject"
    pub overlap: Option<String>,
    /// "defer" or "explain"
    pub phone_commands: Option<String>,
    /// Address encoded in the phone-link QR code
    pub link_origin: Option<String>,
    /// Hand deep links to the system opener
    pub open_links: Option<bool>,
}

/// Simulated phone configuration
#[derive(Debug, Default, Deserialize)]
pub struct PhoneFileConfig {
    pub model: Option<String>,
    pub battery: Option<u8>,
}

/// Ambient simulator configuration
#[derive(Debug, Default, Deserialize)]
pub struct AmbientFileConfig {
    pub enabled: Option<bool>,
    pub stats_interval_secs: Option<u64>,
    pub notification_interval_secs: Option<u64>,
    /// Probability that a notification tick produces a notification
    pub notification_chance: Option<f64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `LiaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> LiaConfigFile {
    config_file_path().map_or_else(LiaConfigFile::default, |path| load_config_file_at(&path))
}

/// Load the TOML config file at `path`
///
/// Returns `LiaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_at(path: &Path) -> LiaConfigFile {
    if !path.exists() {
        return LiaConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                LiaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            LiaConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns [`crate::Error::Toml`] if `content` is not a valid config file
pub fn parse_config_file(content: &str) -> crate::Result<LiaConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/lia/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("lia").join("config.toml"))
}
