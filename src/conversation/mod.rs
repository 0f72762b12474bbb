//! Conversation transcript and message types
//!
//! The transcript is append-only: messages never change once pushed.

mod window;

use std::path::Path;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub use window::{ContextPolicy, ContextWindow, SUMMARY_HEADER};

/// Greeting the transcript opens with
pub const GREETING: &str = "Hello! I'm Lia. I'm awake and ready to help. I can now also link with \
your mobile device to help you manage calls and messages. How are you doing today, madam?";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used by the generation API
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// What kind of deep link an action carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    OpenApp,
    PhoneAction,
}

/// Icon hint for an action affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionIcon {
    Phone,
    Message,
    Battery,
    Map,
}

/// A clickable deep link attached to an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub label: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<ActionIcon>,
}

impl Action {
    /// Link that opens an app or website
    #[must_use]
    pub fn open_app(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::OpenApp,
            label: label.into(),
            url: url.into(),
            icon: None,
        }
    }

    /// Link handled by the user's phone (`tel:`, `sms:`)
    #[must_use]
    pub fn phone(label: impl Into<String>, url: impl Into<String>, icon: ActionIcon) -> Self {
        Self {
            kind: ActionKind::PhoneAction,
            label: label.into(),
            url: url.into(),
            icon: Some(icon),
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Set for user turns that came from dictation
    #[serde(default)]
    pub is_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl Message {
    /// Create a user message
    #[must_use]
    pub fn user(text: impl Into<String>, is_audio: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            is_audio,
            action: None,
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn model(text: impl Into<String>, action: Option<Action>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Model,
            text: text.into(),
            timestamp: Utc::now(),
            is_audio: false,
            action,
        }
    }
}

/// Ordered, append-only conversation history
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Create a transcript seeded with the assistant greeting
    #[must_use]
    pub fn with_greeting() -> Self {
        Self {
            messages: vec![Message::model(GREETING, None)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent message that carries an action
    #[must_use]
    pub fn last_action(&self) -> Option<&Action> {
        self.messages.iter().rev().find_map(|m| m.action.as_ref())
    }
}

/// Image sent alongside (or instead of) user text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageAttachment {
    /// Read an image file, inferring the MIME type from its extension
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the extension is not a known image type
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let mime_type = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "heif" => "image/heif",
            other => {
                return Err(Error::InvalidImage(format!(
                    "unsupported extension {other:?} for {}",
                    path.display()
                )));
            }
        };

        let data = std::fs::read(path)?;
        if data.is_empty() {
            return Err(Error::InvalidImage(format!("{} is empty", path.display())));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    ///
    /// # Errors
    ///
    /// Returns error if the URL is not a base64 image data URL
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidImage("not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidImage("data URL has no payload".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidImage("data URL is not base64 encoded".to_string()))?;

        if !mime_type.starts_with("image/") {
            return Err(Error::InvalidImage(format!("unexpected MIME type {mime_type}")));
        }

        let data = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_starts_with_greeting() {
        let transcript = Transcript::with_greeting();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::Model);
        assert!(transcript.messages()[0].text.starts_with("Hello! I'm Lia."));
    }

    #[test]
    fn test_last_action() {
        let mut transcript = Transcript::new();
        transcript.push(Message::model("a", Some(Action::open_app("Open X", "https://x.com"))));
        transcript.push(Message::user("b", false));
        transcript.push(Message::model("c", None));

        assert_eq!(transcript.last_action().map(|a| a.url.as_str()), Some("https://x.com"));
    }

    #[test]
    fn test_action_serialization() {
        let action = Action::phone("Call Mum", "tel:123", ActionIcon::Phone);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "phone_action");
        assert_eq!(json["icon"], "phone");

        let json = serde_json::to_value(Action::open_app("Open", "https://a.b")).unwrap();
        assert!(json.get("icon").is_none());
    }

    #[test]
    fn test_data_url() {
        let image = ImageAttachment::from_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, b"hello");

        assert!(ImageAttachment::from_data_url("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(ImageAttachment::from_data_url("data:image/png,raw").is_err());
        assert!(ImageAttachment::from_data_url("https://example.com/a.png").is_err());
    }

    #[test]
    fn test_image_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.JPG");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let image = ImageAttachment::from_path(&path).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data.len(), 3);

        let bad = dir.path().join("notes.txt");
        std::fs::write(&bad, "hi").unwrap();
        assert!(ImageAttachment::from_path(&bad).is_err());
    }
}
