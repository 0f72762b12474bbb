//! Local utterance patterns resolved without the model

use std::sync::LazyLock;

use regex::Regex;

use crate::phone::PhoneCommand;

static CALL_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)call\s+(.+)").expect("valid regex"));

static MESSAGE_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)message\s+(.+)").expect("valid regex"));

/// A locally recognized request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Show the phone-link QR code
    LinkPhone,
    /// Place a call or draft a message
    Phone(PhoneCommand),
}

impl Intent {
    /// Match `text` against the local patterns, first match wins
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();

        if lower.contains("qr") || lower.contains("connect my phone") {
            return Some(Self::LinkPhone);
        }
        if lower.contains("call") || lower.contains("phone") {
            return Some(Self::Phone(PhoneCommand::Call(target(&CALL_TARGET, text))));
        }
        if lower.contains("message") || lower.contains("sms") {
            return Some(Self::Phone(PhoneCommand::Message(target(&MESSAGE_TARGET, text))));
        }
        None
    }
}

fn target(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}
