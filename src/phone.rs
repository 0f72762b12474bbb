//! Simulated phone link
//!
//! There is no real device protocol. Connecting and disconnecting are
//! explicit user actions, and phone commands only produce `tel:`/`sms:`
//! deep links.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::conversation::{Action, ActionIcon};

/// Reply for phone commands while no phone is linked
pub const NOT_LINKED_MESSAGE: &str = "Madam, your phone isn't linked yet. Ask me for your QR \
code, scan it with your phone, then type /connect to establish a secure connection.";

/// State of the linked phone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneLinkState {
    pub connected: bool,
    /// Battery percentage, 0-100
    pub battery: u8,
    pub model: String,
    pub last_seen: DateTime<Utc>,
}

impl Default for PhoneLinkState {
    fn default() -> Self {
        Self::new("iPhone 15 Pro", 85)
    }
}

impl PhoneLinkState {
    /// Create a disconnected phone
    #[must_use]
    pub fn new(model: impl Into<String>, battery: u8) -> Self {
        Self {
            connected: false,
            battery: battery.min(100),
            model: model.into(),
            last_seen: Utc::now(),
        }
    }

    pub fn connect(&mut self) {
        self.connected = true;
        self.last_seen = Utc::now();
        tracing::info!(model = %self.model, "phone linked");
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        tracing::info!(model = %self.model, "phone unlinked");
    }

    /// Status line used in the system instruction
    #[must_use]
    pub fn status_line(&self) -> String {
        if self.connected {
            format!("Connected ({}, {}% battery)", self.model, self.battery)
        } else {
            "Disconnected".to_string()
        }
    }

    /// Resolve a phone command into reply text and an optional deep link
    #[must_use]
    pub fn resolve(&self, command: &PhoneCommand) -> PhoneReply {
        if !self.connected {
            return PhoneReply {
                text: NOT_LINKED_MESSAGE.to_string(),
                action: None,
            };
        }

        match command {
            PhoneCommand::Call(target) => {
                let target = target.as_deref();
                PhoneReply {
                    text: format!(
                        "I've prepared the outgoing call to {}, madam.",
                        target.unwrap_or("your contact")
                    ),
                    action: Some(Action::phone(
                        format!("Call {}", target.unwrap_or("Contact")),
                        format!("tel:{}", target.unwrap_or_default()),
                        ActionIcon::Phone,
                    )),
                }
            }
            PhoneCommand::Message(target) => {
                let target = target.as_deref();
                PhoneReply {
                    text: format!(
                        "I've drafted a message for {}, madam.",
                        target.unwrap_or("your contact")
                    ),
                    action: Some(Action::phone(
                        format!("Message {}", target.unwrap_or("Contact")),
                        format!("sms:{}", target.unwrap_or_default()),
                        ActionIcon::Message,
                    )),
                }
            }
        }
    }
}

/// A phone command recognized in user text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneCommand {
    /// Place a call, optionally to a named target
    Call(Option<String>),
    /// Draft an SMS, optionally to a named target
    Message(Option<String>),
}

/// Locally resolved phone reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneReply {
    pub text: String,
    pub action: Option<Action>,
}

/// Reply carrying a QR code that links the phone to `origin`
#[must_use]
pub fn qr_link_message(origin: &str) -> String {
    let qr_url = format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data={}",
        urlencoding::encode(origin)
    );
    format!(
        "Certainly, madam. Here is your unique QR code to link your mobile device with my \
         systems. Simply scan this with your phone's camera.\n\n![QR Code]({qr_url})"
    )
}
