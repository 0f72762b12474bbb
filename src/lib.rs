//! Lia - a conversational companion on top of the Gemini API
//!
//! This library provides the pieces of the Lia assistant:
//! - Turn handling with local phone patterns and model tool calls
//! - Gemini chat, transcription and speech synthesis
//! - Dictation and wake-word speech input
//! - Simulated phone link, system stats and notifications
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Terminal (repl)                     │
//! │   typed text  │  /image  │  dictation  │  wake word │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Assistant + Session                  │
//! │   patterns  │  tools  │  context window  │  events  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Gemini (hosted)                      │
//! │   generateContent  │  transcription  │  TTS         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod ambient;
pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod phone;
pub mod repl;
pub mod session;
pub mod tools;
pub mod voice;

pub use assistant::{
    Assistant, AssistantSettings, OverlapPolicy, PhoneCommandPolicy, TurnOutcome, UserInput,
};
pub use config::Config;
pub use conversation::{Action, ContextPolicy, ImageAttachment, Message, Role};
pub use error::{Error, Result};
pub use llm::{GeminiClient, LanguageModel};
pub use session::{Session, SessionEvent};
pub use tools::{LinkOpener, NullOpener, SystemOpener, ToolRegistry};
