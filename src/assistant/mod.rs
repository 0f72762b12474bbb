//! Turn controller
//!
//! Owns the turn sequence: append the user message, call the model,
//! apply local pattern overrides and tool calls, append exactly one
//! assistant reply, and optionally speak it.

mod intent;
mod prompt;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::conversation::{ContextPolicy, ContextWindow, ImageAttachment, Message, Role};
use crate::llm::{Content, FunctionDeclaration, GenerateRequest, LanguageModel, ModelResponse, Part};
use crate::phone::qr_link_message;
use crate::session::Session;
use crate::tools::ToolRegistry;
use crate::voice::SpeechOutput;
use crate::{Error, Result};

pub use intent::Intent;
pub use prompt::{GLITCH_REPLY, IMAGE_ONLY_TEXT, NETWORK_TROUBLE_REPLY, system_instruction};

/// What happens to a send while another turn is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Wait for the running turn; turns complete in submission order
    #[default]
    Queue,
    /// Fail with [`Error::TurnInProgress`] and append nothing
    Reject,
}

/// Reply to a phone command while no phone is linked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhoneCommandPolicy {
    /// Keep the model's own reply
    #[default]
    DeferToModel,
    /// Replace it with the "not linked" notice
    ExplainUnlinked,
}

/// Turn controller settings
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub context: ContextPolicy,
    pub overlap: OverlapPolicy,
    pub phone_commands: PhoneCommandPolicy,
    /// Address encoded in the phone-link QR code
    pub link_origin: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            context: ContextPolicy::default(),
            overlap: OverlapPolicy::default(),
            phone_commands: PhoneCommandPolicy::default(),
            link_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// One user submission
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub image: Option<ImageAttachment>,
    /// Came from dictation
    pub is_audio: bool,
}

impl UserInput {
    /// Typed text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Dictated text
    #[must_use]
    pub fn dictated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            is_audio: true,
        }
    }

    /// Attach an image
    #[must_use]
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }
}

/// The two messages a turn appended
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub user: Message,
    pub reply: Message,
}

/// Conversational turn controller
pub struct Assistant {
    session: Arc<Session>,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    declarations: Vec<FunctionDeclaration>,
    speech: Option<Arc<SpeechOutput>>,
    settings: AssistantSettings,
    /// Single-turn gate; also holds the context window state
    turn: Mutex<ContextWindow>,
}

impl Assistant {
    #[must_use]
    pub fn new(
        session: Arc<Session>,
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        settings: AssistantSettings,
    ) -> Self {
        let declarations = tools.declarations();
        let window = ContextWindow::new(settings.context);

        Self {
            session,
            model,
            tools,
            declarations,
            speech: None,
            settings,
            turn: Mutex::new(window),
        }
    }

    /// Speak replies through `speech` while audio is enabled
    #[must_use]
    pub fn with_speech(mut self, speech: Arc<SpeechOutput>) -> Self {
        self.speech = Some(speech);
        self
    }

    #[must_use]
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Speak `text` on a background task
    ///
    /// Returns `None` without speaking when audio is muted or no speech
    /// output is attached.
    pub fn speak(&self, text: String) -> Option<JoinHandle<bool>> {
        if !self.session.audio_enabled() {
            return None;
        }
        self.speech.as_ref().map(|speech| speech.speak_detached(text))
    }

    /// Tool schema advertised to the model
    #[must_use]
    pub fn declarations(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    /// Run one turn
    ///
    /// Returns `Ok(None)` for empty input. Model failures never surface
    /// here; they become the fallback reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TurnInProgress`] under [`OverlapPolicy::Reject`]
    /// when another turn is running
    pub async fn send(&self, input: UserInput) -> Result<Option<TurnOutcome>> {
        let text = input.text.trim();
        if text.is_empty() && input.image.is_none() {
            return Ok(None);
        }

        let mut window = match self.settings.overlap {
            OverlapPolicy::Queue => self.turn.lock().await,
            OverlapPolicy::Reject => self.turn.try_lock().map_err(|_| {
                tracing::debug!("rejecting overlapping turn");
                Error::TurnInProgress
            })?,
        };

        let prior = self.session.messages();
        let display = if text.is_empty() { IMAGE_ONLY_TEXT } else { text };
        let user = Message::user(display, input.is_audio);
        self.session.append(user.clone());

        tracing::info!(
            chars = text.len(),
            image = input.image.is_some(),
            audio = input.is_audio,
            "turn started"
        );

        self.session.set_typing(true);
        let response = self
            .request(&mut window, &prior, text, input.image.as_ref())
            .await;
        self.session.set_typing(false);

        let answered = response.is_ok();
        let reply = self.resolve(text, response);
        self.session.append(reply.clone());
        drop(window);

        tracing::info!(action = ?reply.action.as_ref().map(|a| &a.url), "turn finished");

        // Fallback replies after a failed request stay silent
        if answered {
            let _ = self.speak(reply.text.clone());
        }

        Ok(Some(TurnOutcome { user, reply }))
    }

    async fn request(
        &self,
        window: &mut ContextWindow,
        prior: &[Message],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<ModelResponse> {
        let mut contents = window.prepare(prior, self.model.as_ref()).await;

        let mut parts = Vec::with_capacity(2);
        if !text.is_empty() {
            parts.push(Part::Text(text.to_string()));
        }
        if let Some(image) = image {
            parts.push(Part::InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            });
        }
        contents.push(Content {
            role: Role::User,
            parts,
        });

        let instruction = system_instruction(&self.session.phone(), &self.session.stats());

        self.model
            .generate(GenerateRequest {
                contents: &contents,
                system_instruction: &instruction,
                tools: &self.declarations,
            })
            .await
    }

    /// Turn the model result into the assistant reply
    fn resolve(&self, text: &str, response: Result<ModelResponse>) -> Message {
        let intent = Intent::detect(text);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "model request failed");
                let reply = if intent == Some(Intent::LinkPhone) {
                    qr_link_message(&self.settings.link_origin)
                } else {
                    NETWORK_TROUBLE_REPLY.to_string()
                };
                return Message::model(reply, None);
            }
        };

        let mut reply = response
            .text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| GLITCH_REPLY.to_string());
        let mut action = None;

        match intent {
            Some(Intent::LinkPhone) => reply = qr_link_message(&self.settings.link_origin),
            Some(Intent::Phone(command)) => {
                let phone = self.session.phone();
                if phone.connected
                    || self.settings.phone_commands == PhoneCommandPolicy::ExplainUnlinked
                {
                    let resolved = phone.resolve(&command);
                    reply = resolved.text;
                    action = resolved.action;
                }
            }
            None => {}
        }

        for call in &response.function_calls {
            if let Some(outcome) = self.tools.dispatch(call) {
                reply = outcome.text;
                action = outcome.action;
            }
        }

        Message::model(reply, action)
    }
}
