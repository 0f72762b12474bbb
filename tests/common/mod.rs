//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use lia_companion::assistant::AssistantSettings;
use lia_companion::llm::{Content, FunctionCall, GenerateRequest, LanguageModel, ModelResponse};
use lia_companion::tools::{LinkOpener, ToolRegistry};
use lia_companion::voice::{AudioBuffer, AudioSink, Recognizer, SessionId, SpeechSynthesizer};
use lia_companion::{Assistant, Error, Result, Session};

/// What the model saw for one request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub contents: Vec<Content>,
    pub system_instruction: String,
    pub tool_names: Vec<String>,
}

/// Language model that replays scripted responses
///
/// Once the script runs out every request gets "As you wish, madam.".
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedModel {
    pub fn new(script: impl IntoIterator<Item = Result<ModelResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Hold every request until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            contents: request.contents.to_vec(),
            system_instruction: request.system_instruction.to_string(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ModelResponse::from_text("As you wish, madam.")))
    }
}

/// Model reply text
pub fn reply(text: &str) -> Result<ModelResponse> {
    Ok(ModelResponse::from_text(text))
}

/// Model reply carrying tool calls
pub fn tool_calls(text: Option<&str>, calls: &[(&str, serde_json::Value)]) -> Result<ModelResponse> {
    Ok(ModelResponse {
        text: text.map(ToString::to_string),
        function_calls: calls
            .iter()
            .map(|(name, args)| FunctionCall {
                name: (*name).to_string(),
                args: args.as_object().cloned().unwrap_or_default(),
            })
            .collect(),
    })
}

/// Failed model call
pub fn failure() -> Result<ModelResponse> {
    Err(Error::Llm("503 Service Unavailable".to_string()))
}

/// Synthesizer returning a fixed base64 PCM payload
pub struct FixedSynth {
    pub payload: Option<String>,
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FixedSynth {
    /// Four samples of silence
    pub fn silence() -> Self {
        Self {
            payload: Some("AAAAAAAAAAA=".to_string()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FixedSynth {
    async fn synthesize(&self, text: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("500 Internal Server Error".to_string()));
        }
        Ok(self.payload.clone())
    }
}

/// Audio sink that remembers what it was asked to play
#[derive(Default)]
pub struct RecordingSink {
    pub played: Mutex<Vec<AudioBuffer>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, buffer: AudioBuffer) -> Result<()> {
        self.played.lock().unwrap().push(buffer);
        Ok(())
    }
}

/// Recognizer that records starts and stops
#[derive(Default)]
pub struct FakeRecognizer {
    pub unavailable: bool,
    pub starts: Vec<SessionId>,
    pub stops: usize,
}

impl Recognizer for FakeRecognizer {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn start(&mut self, session: SessionId, _language: &str) -> Result<()> {
        self.starts.push(session);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

/// Link opener that records links and optionally refuses them
#[derive(Default)]
pub struct RecordingOpener {
    pub refuse: bool,
    pub opened: Mutex<Vec<String>>,
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<()> {
        if self.refuse {
            return Err(Error::Config("popup blocked".to_string()));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Assistant over a fresh session with the built-in tools
pub fn assistant(
    model: Arc<ScriptedModel>,
    opener: Arc<RecordingOpener>,
    settings: AssistantSettings,
) -> Assistant {
    let session = Arc::new(Session::default());
    Assistant::new(session, model, ToolRegistry::with_builtins(opener), settings)
}

/// Poll `check` until it holds or a second passes
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
