//! Gemini `generateContent` client
//!
//! One HTTP client and one credential back chat, transcription and
//! speech synthesis. Each call makes a single attempt.

use async_trait::async_trait;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{
    Content, FunctionCall, FunctionDeclaration, GenerateRequest, LanguageModel, ModelResponse,
    Part, Transcriber,
};
use crate::{Error, Result};

/// Public Gemini endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model and endpoint selection for [`GeminiClient`]
#[derive(Debug)]
pub struct GeminiSettings {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

/// Client for the hosted Gemini API
pub struct GeminiClient {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    /// Create a new client
    ///
    /// A missing API key is not an error here. Every call fails with
    /// [`Error::MissingCredential`] instead.
    #[must_use]
    pub fn new(settings: GeminiSettings) -> Self {
        if settings.api_key.is_none() {
            tracing::warn!("no Gemini API key configured, model calls will fail");
        }

        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// Whether a credential is configured
    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.settings.api_key.is_some()
    }

    /// Synthesize speech and return the base64 PCM payload
    ///
    /// Returns `Ok(None)` when the response carries no audio part.
    ///
    /// # Errors
    ///
    /// Returns error if the credential is missing or the request fails
    pub async fn synthesize_speech(&self, text: &str) -> Result<Option<String>> {
        let contents = [Content::user_text(text)];
        let body = WireRequest {
            contents: contents.iter().map(WireContent::from).collect(),
            system_instruction: None,
            tools: Vec::new(),
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &self.settings.tts_voice,
                        },
                    },
                }),
            }),
        };

        let response = self
            .generate_content(&self.settings.tts_model, &body)
            .await
            .map_err(|e| match e {
                Error::Llm(msg) => Error::Tts(msg),
                other => other,
            })?;

        Ok(response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.inline_data)
            .map(|d| d.data))
    }

    /// POST a `generateContent` request for `model`
    async fn generate_content(&self, model: &str, body: &WireRequest<'_>) -> Result<WireResponse> {
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .ok_or(Error::MissingCredential)?;

        let url = format!(
            "{}/v1beta/models/{model}:generateContent",
            self.settings.base_url.trim_end_matches('/')
        );

        tracing::debug!(model, contents = body.contents.len(), "sending generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model, "Gemini request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(Error::Llm(format!("Gemini API error {status}: {body}")));
        }

        let parsed: WireResponse = response.json().await?;
        Ok(parsed)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<ModelResponse> {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTool {
                function_declarations: request.tools.iter().map(WireDeclaration::from).collect(),
            }]
        };

        let body = WireRequest {
            contents: request.contents.iter().map(WireContent::from).collect(),
            system_instruction: (!request.system_instruction.is_empty()).then(|| WireContent {
                role: None,
                parts: vec![WirePart::Text {
                    text: request.system_instruction,
                }],
            }),
            tools,
            generation_config: None,
        };

        let response = self
            .generate_content(&self.settings.chat_model, &body)
            .await?;
        let parsed = response.into_model_response();

        tracing::debug!(
            text_len = parsed.text.as_deref().map_or(0, str::len),
            function_calls = parsed.function_calls.len(),
            "model responded"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, wav: Vec<u8>, language: &str) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), language, "starting transcription");

        let prompt = format!(
            "Transcribe this {language} speech verbatim. Reply with the transcript only, \
             or with nothing if no words are spoken."
        );
        let contents = [Content {
            role: crate::conversation::Role::User,
            parts: vec![
                Part::Text(prompt),
                Part::InlineData {
                    mime_type: "audio/wav".to_string(),
                    data: wav,
                },
            ],
        }];

        let body = WireRequest {
            contents: contents.iter().map(WireContent::from).collect(),
            system_instruction: None,
            tools: Vec::new(),
            generation_config: None,
        };

        let response = self
            .generate_content(&self.settings.transcription_model, &body)
            .await
            .map_err(|e| match e {
                Error::Llm(msg) => Error::Recognition(msg),
                other => other,
            })?;

        let text = response.into_model_response().text.unwrap_or_default();
        let text = text.trim().to_string();
        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<WirePart<'a>>,
}

impl<'a> From<&'a Content> for WireContent<'a> {
    fn from(content: &'a Content) -> Self {
        Self {
            role: Some(content.role.as_str()),
            parts: content
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => WirePart::Text {
                        text: text.as_str(),
                    },
                    Part::InlineData { mime_type, data } => WirePart::InlineData {
                        inline_data: WireBlob {
                            mime_type: mime_type.as_str(),
                            data: base64::engine::general_purpose::STANDARD.encode(data),
                        },
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: WireBlob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool<'a> {
    function_declarations: Vec<WireDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct WireDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

impl<'a> From<&'a FunctionDeclaration> for WireDeclaration<'a> {
    fn from(decl: &'a FunctionDeclaration) -> Self {
        Self {
            name: &decl.name,
            description: &decl.description,
            parameters: &decl.parameters,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireResponseContent>,
}

#[derive(Debug, Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    function_call: Option<WireFunctionCall>,
    inline_data: Option<WireResponseBlob>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireResponseBlob {
    data: String,
}

impl WireResponse {
    /// Collapse the first candidate into text plus tool calls
    fn into_model_response(self) -> ModelResponse {
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut text = String::new();
        let mut function_calls = Vec::new();

        for part in parts {
            if let Some(t) = part.text.filter(|_| !part.thought) {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                function_calls.push(FunctionCall {
                    name: call.name,
                    args: call.args,
                });
            }
        }

        ModelResponse {
            text: (!text.is_empty()).then_some(text),
            function_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn test_request_serialization() {
        let contents = vec![
            Content::user_text("hi"),
            Content {
                role: Role::User,
                parts: vec![
                    Part::Text("look".to_string()),
                    Part::InlineData {
                        mime_type: "image/png".to_string(),
                        data: b"hello".to_vec(),
                    },
                ],
            },
        ];
        let decl = FunctionDeclaration {
            name: "getWeather".to_string(),
            description: "Weather".to_string(),
            parameters: serde_json::json!({"type": "OBJECT"}),
        };
        let decls = [decl];

        let body = WireRequest {
            contents: contents.iter().map(WireContent::from).collect(),
            system_instruction: Some(WireContent {
                role: None,
                parts: vec![WirePart::Text { text: "be nice" }],
            }),
            tools: vec![WireTool {
                function_declarations: decls.iter().map(WireDeclaration::from).collect(),
            }],
            generation_config: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            json["contents"][1]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["contents"][1]["parts"][1]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be nice");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(
            json["tools"][0]["functionDeclarations"][0]["name"],
            "getWeather"
        );
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "Hello "},
                        {"text": "madam."},
                        {"functionCall": {"name": "getWeather", "args": {"location": "Paris"}}}
                    ]
                }
            }]
        });

        let response: WireResponse = serde_json::from_value(raw).unwrap();
        let parsed = response.into_model_response();

        assert_eq!(parsed.text.as_deref(), Some("Hello madam."));
        assert_eq!(parsed.function_calls.len(), 1);
        assert_eq!(parsed.function_calls[0].name, "getWeather");
        assert_eq!(parsed.function_calls[0].args["location"], "Paris");
    }

    #[test]
    fn test_empty_response() {
        let response: WireResponse = serde_json::from_str("{}").unwrap();
        let parsed = response.into_model_response();
        assert!(parsed.text.is_none());
        assert!(parsed.function_calls.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let client = GeminiClient::new(GeminiSettings {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: "m".to_string(),
            transcription_model: "m".to_string(),
            tts_model: "t".to_string(),
            tts_voice: "Zephyr".to_string(),
        });

        let contents = [Content::user_text("hi")];
        let result = client
            .generate(GenerateRequest {
                contents: &contents,
                system_instruction: "",
                tools: &[],
            })
            .await;
        assert!(matches!(result, Err(Error::MissingCredential)));

        let speech = client.synthesize_speech("hello").await;
        assert!(matches!(speech, Err(Error::MissingCredential)));
    }
}
