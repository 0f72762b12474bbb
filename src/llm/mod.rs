//! Language model abstraction
//!
//! The turn controller talks to the model only through [`LanguageModel`].
//! [`GeminiClient`] is the hosted implementation.

mod gemini;

use async_trait::async_trait;

use crate::Result;
use crate::conversation::{Message, Role};

pub use gemini::{DEFAULT_BASE_URL, GeminiClient, GeminiSettings};

/// One part of a conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Binary payload (image, audio) sent inline as base64
    InlineData { mime_type: String, data: Vec<u8> },
}

/// A role-tagged conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Single text part from the user
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Text-only content for a transcript message
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self {
            role: message.role,
            parts: vec![Part::Text(message.text.clone())],
        }
    }
}

/// Function the model may ask the caller to run
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON object schema for the arguments
    pub parameters: serde_json::Value,
}

/// A structured tool call requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Model output for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub function_calls: Vec<FunctionCall>,
}

impl ModelResponse {
    /// Plain text response with no tool calls
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_calls: Vec::new(),
        }
    }
}

/// Everything sent to the model for one generation
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub contents: &'a [Content],
    pub system_instruction: &'a str,
    pub tools: &'a [FunctionDeclaration],
}

/// Remote text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a response for the given conversation
    ///
    /// # Errors
    ///
    /// Returns error if the credential is missing or the request fails
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse>;
}

/// Remote speech-to-text for recorded utterances
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV audio spoken in `language` (a BCP 47 tag)
    ///
    /// # Errors
    ///
    /// Returns error if the credential is missing or the request fails
    async fn transcribe(&self, wav: Vec<u8>, language: &str) -> Result<String>;
}
