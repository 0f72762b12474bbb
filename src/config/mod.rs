//! Configuration management for Lia
//!
//! Sources are layered: built-in defaults, then the TOML file, then
//! environment variables.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::assistant::{OverlapPolicy, PhoneCommandPolicy};
use crate::conversation::ContextPolicy;
use crate::llm::{DEFAULT_BASE_URL, GeminiSettings};
use crate::voice::DEFAULT_SPEECH_CHAR_LIMIT;
use crate::{Error, Result};

use file::LiaConfigFile;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-3.1-pro-preview";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TTS_VOICE: &str = "Zephyr";

/// Lia configuration
#[derive(Debug)]
pub struct Config {
    /// Gemini endpoint, models and credential
    pub gemini: GeminiSettings,

    /// Speech input and output
    pub voice: VoiceConfig,

    /// Turn handling
    pub conversation: ConversationConfig,

    /// Simulated phone
    pub phone: PhoneConfig,

    /// Ambient simulators
    pub ambient: AmbientConfig,
}

/// Speech configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Speak assistant replies
    pub audio_enabled: bool,

    /// Wake token, matched case-insensitively
    pub wake_word: String,

    /// BCP 47 recognition language
    pub language: String,

    /// Delay between the wake acknowledgement and dictation
    pub wake_resume: Duration,

    /// Maximum characters sent to speech synthesis
    pub speech_char_limit: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            wake_word: "lia".to_string(),
            language: "en-US".to_string(),
            wake_resume: Duration::from_millis(1000),
            speech_char_limit: DEFAULT_SPEECH_CHAR_LIMIT,
        }
    }
}

/// Turn handling configuration
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// How much history each request carries
    pub context: ContextPolicy,

    /// What happens to a send while a turn is in flight
    pub overlap: OverlapPolicy,

    /// Reply to phone commands while no phone is linked
    pub phone_commands: PhoneCommandPolicy,

    /// Address encoded in the phone-link QR code
    pub link_origin: String,

    /// Hand deep links to the system opener
    pub open_links: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context: ContextPolicy::default(),
            overlap: OverlapPolicy::default(),
            phone_commands: PhoneCommandPolicy::default(),
            link_origin: "http://localhost:3000".to_string(),
            open_links: true,
        }
    }
}

/// Simulated phone configuration
#[derive(Debug, Clone)]
pub struct PhoneConfig {
    pub model: String,
    /// Battery percentage, 0-100
    pub battery: u8,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            model: "iPhone 15 Pro".to_string(),
            battery: 85,
        }
    }
}

/// Ambient simulator configuration
#[derive(Debug, Clone)]
pub struct AmbientConfig {
    pub enabled: bool,

    /// Period of the system stats refresh
    pub stats_interval: Duration,

    /// Period of the notification roll
    pub notification_interval: Duration,

    /// Probability that a roll produces a notification
    pub notification_chance: f64,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stats_interval: Duration::from_secs(3),
            notification_interval: Duration::from_secs(45),
            notification_chance: 0.2,
        }
    }
}

impl Config {
    /// Load configuration from the standard file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a policy name or value is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit file and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a policy name or value is invalid
    pub fn load_from(path: &Path) -> Result<Self> {
        let fc = file::load_config_file_at(path);
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a policy name or value is invalid
    pub fn from_sources(fc: LiaConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = env("GEMINI_API_KEY")
            .or(fc.gemini.api_key)
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let gemini = GeminiSettings {
            api_key,
            base_url: env("LIA_GEMINI_BASE_URL")
                .or(fc.gemini.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            chat_model: env("LIA_CHAT_MODEL")
                .or(fc.gemini.chat_model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            transcription_model: fc
                .gemini
                .transcription_model
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            tts_model: env("LIA_TTS_MODEL")
                .or(fc.gemini.tts_model)
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            tts_voice: env("LIA_TTS_VOICE")
                .or(fc.gemini.tts_voice)
                .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
        };

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            audio_enabled: env("LIA_AUDIO")
                .map(|v| parse_flag(&v))
                .or(fc.voice.audio_enabled)
                .unwrap_or(voice_defaults.audio_enabled),
            wake_word: env("LIA_WAKE_WORD")
                .or(fc.voice.wake_word)
                .filter(|w| !w.trim().is_empty())
                .unwrap_or(voice_defaults.wake_word),
            language: env("LIA_LANGUAGE")
                .or(fc.voice.language)
                .unwrap_or(voice_defaults.language),
            wake_resume: fc
                .voice
                .wake_resume_ms
                .map_or(voice_defaults.wake_resume, Duration::from_millis),
            speech_char_limit: fc
                .voice
                .speech_char_limit
                .unwrap_or(voice_defaults.speech_char_limit),
        };

        let conversation = Self::conversation(fc.conversation, &env)?;

        let phone_defaults = PhoneConfig::default();
        let phone = PhoneConfig {
            model: fc.phone.model.unwrap_or(phone_defaults.model),
            battery: fc.phone.battery.unwrap_or(phone_defaults.battery).min(100),
        };

        let ambient_defaults = AmbientConfig::default();
        let notification_chance = fc
            .ambient
            .notification_chance
            .unwrap_or(ambient_defaults.notification_chance);
        if !(0.0..=1.0).contains(&notification_chance) {
            return Err(Error::Config(format!(
                "notification_chance must be between 0 and 1, got {notification_chance}"
            )));
        }
        let ambient = AmbientConfig {
            enabled: fc.ambient.enabled.unwrap_or(ambient_defaults.enabled),
            stats_interval: fc
                .ambient
                .stats_interval_secs
                .filter(|s| *s > 0)
                .map_or(ambient_defaults.stats_interval, Duration::from_secs),
            notification_interval: fc
                .ambient
                .notification_interval_secs
                .filter(|s| *s > 0)
                .map_or(ambient_defaults.notification_interval, Duration::from_secs),
            notification_chance,
        };

        Ok(Self {
            gemini,
            voice,
            conversation,
            phone,
            ambient,
        })
    }

    fn conversation(
        fc: file::ConversationFileConfig,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<ConversationConfig> {
        let defaults = ConversationConfig::default();

        let max_messages = match env("LIA_CONTEXT_MAX_MESSAGES") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!("invalid LIA_CONTEXT_MAX_MESSAGES {raw:?}: {e}"))
            })?),
            None => fc.max_messages,
        };
        if max_messages == Some(0) {
            return Err(Error::Config("max_messages must be at least 1".to_string()));
        }
        let max_messages = max_messages.unwrap_or(40);

        let fraction = fc.compact_fraction.unwrap_or(0.5);
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::Config(format!(
                "compact_fraction must be between 0 and 1, got {fraction}"
            )));
        }

        let context = match fc.context.as_deref().map(str::trim) {
            None | Some("sliding") => ContextPolicy::SlidingWindow { max_messages },
            Some("unbounded") => ContextPolicy::Unbounded,
            Some("compact") => ContextPolicy::Compacting {
                max_messages,
                fraction,
            },
            Some(other) => {
                return Err(Error::Config(format!("unknown context policy {other:?}")));
            }
        };

        let overlap = match fc.overlap.as_deref().map(str::trim) {
            None | Some("queue") => OverlapPolicy::Queue,
            Some("reject") => OverlapPolicy::Reject,
            Some(other) => {
                return Err(Error::Config(format!("unknown overlap policy {other:?}")));
            }
        };

        let phone_commands = match fc.phone_commands.as_deref().map(str::trim) {
            None | Some("defer") => PhoneCommandPolicy::DeferToModel,
            Some("explain") => PhoneCommandPolicy::ExplainUnlinked,
            Some(other) => {
                return Err(Error::Config(format!(
                    "unknown phone command policy {other:?}"
                )));
            }
        };

        Ok(ConversationConfig {
            context,
            overlap,
            phone_commands,
            link_origin: fc.link_origin.unwrap_or(defaults.link_origin),
            open_links: fc.open_links.unwrap_or(defaults.open_links),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(toml_src: &str, env: &[(&str, &str)]) -> Result<Config> {
        let fc: LiaConfigFile = toml::from_str(toml_src).unwrap();
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_sources(fc, |key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config("", &[]).unwrap();

        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.gemini.tts_voice, "Zephyr");
        assert!(config.voice.audio_enabled);
        assert_eq!(config.voice.wake_word, "lia");
        assert_eq!(config.voice.language, "en-US");
        assert_eq!(
            config.conversation.context,
            ContextPolicy::SlidingWindow { max_messages: 40 }
        );
        assert_eq!(config.conversation.overlap, OverlapPolicy::Queue);
        assert_eq!(
            config.conversation.phone_commands,
            PhoneCommandPolicy::DeferToModel
        );
        assert_eq!(config.phone.battery, 85);
        assert_eq!(config.ambient.stats_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = config(
            r#"
            [gemini]
            api_key = "from-file"
            chat_model = "file-model"

            [voice]
            audio_enabled = true
            wake_word = "nova"
            "#,
            &[
                ("GEMINI_API_KEY", "from-env"),
                ("LIA_AUDIO", "0"),
                ("LIA_CONTEXT_MAX_MESSAGES", "8"),
            ],
        )
        .unwrap();

        assert_eq!(
            config.gemini.api_key.as_ref().unwrap().expose_secret(),
            "from-env"
        );
        assert_eq!(config.gemini.chat_model, "file-model");
        assert!(!config.voice.audio_enabled);
        assert_eq!(config.voice.wake_word, "nova");
        assert_eq!(
            config.conversation.context,
            ContextPolicy::SlidingWindow { max_messages: 8 }
        );
    }

    #[test]
    fn test_policies_from_file() {
        let config = config(
            r#"
            [conversation]
            context = "compact"
            max_messages = 20
            compact_fraction = 0.25
            overlap = "reject"
            phone_commands = "explain"
            "#,
            &[],
        )
        .unwrap();

        assert_eq!(
            config.conversation.context,
            ContextPolicy::Compacting {
                max_messages: 20,
                fraction: 0.25
            }
        );
        assert_eq!(config.conversation.overlap, OverlapPolicy::Reject);
        assert_eq!(
            config.conversation.phone_commands,
            PhoneCommandPolicy::ExplainUnlinked
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config("[conversation]\ncontext = \"infinite\"", &[]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config("", &[("LIA_CONTEXT_MAX_MESSAGES", "lots")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config("[ambient]\nnotification_chance = 1.5", &[]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = config("", &[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(config.gemini.api_key.is_none());
    }
}
