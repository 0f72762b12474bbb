//! Context window policy
//!
//! Decides which prior messages are resent to the model each turn. The
//! compacting policy summarizes the oldest messages through the model and
//! sends the summary in their place. The transcript itself is never touched.

use crate::llm::{Content, GenerateRequest, LanguageModel};

use super::{Message, Role};

/// Prefix of the synthetic turn that carries a compaction summary
pub const SUMMARY_HEADER: &str = "[Conversation summary]";

const SUMMARIZE_INSTRUCTION: &str = "You condense conversations between a user and their \
assistant Lia. Preserve key facts, decisions, and user preferences. Keep it under 200 words.";

/// How much history each request carries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextPolicy {
    /// Resend the whole transcript every turn
    Unbounded,
    /// Resend only the newest `max_messages` prior messages
    SlidingWindow { max_messages: usize },
    /// Summarize the oldest `fraction` once more than `max_messages` are unsummarized
    Compacting { max_messages: usize, fraction: f64 },
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self::SlidingWindow { max_messages: 40 }
    }
}

/// Per-conversation context state
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    policy: ContextPolicy,
    summary: Option<String>,
    /// Count of leading transcript messages folded into `summary`
    summarized: usize,
}

impl ContextWindow {
    #[must_use]
    pub fn new(policy: ContextPolicy) -> Self {
        Self {
            policy,
            summary: None,
            summarized: 0,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> ContextPolicy {
        self.policy
    }

    /// Current compaction summary, if any
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Build the history for the next request from the prior transcript
    ///
    /// Compaction failures are non-fatal: the turn falls back to a sliding
    /// window of the same size.
    pub async fn prepare(&mut self, prior: &[Message], model: &dyn LanguageModel) -> Vec<Content> {
        match self.policy {
            ContextPolicy::Unbounded => prior.iter().map(Content::from_message).collect(),
            ContextPolicy::SlidingWindow { max_messages } => sliding(prior, max_messages),
            ContextPolicy::Compacting {
                max_messages,
                fraction,
            } => {
                // A shorter transcript than before means a new conversation
                if self.summarized > prior.len() {
                    self.summary = None;
                    self.summarized = 0;
                }

                let pending = &prior[self.summarized..];
                if pending.len() > max_messages {
                    if let Err(e) = self.compact(pending, fraction, model).await {
                        tracing::warn!(error = %e, "compaction failed, using sliding window");
                        return sliding(prior, max_messages);
                    }
                }

                let mut contents = Vec::with_capacity(prior.len() - self.summarized + 1);
                if let Some(summary) = &self.summary {
                    contents.push(Content::user_text(format!("{SUMMARY_HEADER}\n{summary}")));
                }
                contents.extend(prior[self.summarized..].iter().map(Content::from_message));
                contents
            }
        }
    }

    /// Fold the oldest part of `pending` into the running summary
    async fn compact(
        &mut self,
        pending: &[Message],
        fraction: f64,
        model: &dyn LanguageModel,
    ) -> crate::Result<()> {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let count = (pending.len() as f64 * fraction.clamp(0.0, 1.0)).ceil() as usize;
        let count = count.max(1).min(pending.len() - 1);

        let conversation_text = pending[..count]
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::User => "User",
                    Role::Model => "Lia",
                };
                format!("{speaker}: {}", m.text)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = match &self.summary {
            Some(previous) => format!(
                "Earlier summary:\n{previous}\n\nContinue the summary with this conversation:\n\n{conversation_text}"
            ),
            None => format!("Summarize the following conversation concisely.\n\n{conversation_text}"),
        };

        let contents = [Content::user_text(prompt)];
        let response = model
            .generate(GenerateRequest {
                contents: &contents,
                system_instruction: SUMMARIZE_INSTRUCTION,
                tools: &[],
            })
            .await?;

        let summary = response
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| crate::Error::Llm("empty compaction summary".to_string()))?;

        tracing::info!(
            messages_summarized = count,
            summary_words = summary.split_whitespace().count(),
            "compacted conversation context"
        );

        self.summary = Some(summary);
        self.summarized += count;
        Ok(())
    }
}

fn sliding(prior: &[Message], max_messages: usize) -> Vec<Content> {
    let start = prior.len().saturating_sub(max_messages);
    prior[start..].iter().map(Content::from_message).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ModelResponse, Part};
    use crate::{Error, Result};

    struct Summarizer {
        calls: Mutex<usize>,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for Summarizer {
        async fn generate(&self, _request: GenerateRequest<'_>) -> Result<ModelResponse> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                Err(Error::Llm("down".to_string()))
            } else {
                Ok(ModelResponse::from_text("they talked"))
            }
        }
    }

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{i}"), false)
                } else {
                    Message::model(format!("m{i}"), None)
                }
            })
            .collect()
    }

    fn text_of(content: &Content) -> &str {
        match &content.parts[0] {
            Part::Text(t) => t,
            Part::InlineData { .. } => "",
        }
    }

    #[tokio::test]
    async fn test_unbounded_sends_everything() {
        let model = Summarizer { calls: Mutex::new(0), fail: false };
        let mut window = ContextWindow::new(ContextPolicy::Unbounded);
        let contents = window.prepare(&history(100), &model).await;
        assert_eq!(contents.len(), 100);
    }

    #[tokio::test]
    async fn test_sliding_window_keeps_newest() {
        let model = Summarizer { calls: Mutex::new(0), fail: false };
        let mut window = ContextWindow::new(ContextPolicy::SlidingWindow { max_messages: 4 });
        let contents = window.prepare(&history(10), &model).await;

        assert_eq!(contents.len(), 4);
        assert_eq!(text_of(&contents[0]), "u6");
        assert_eq!(text_of(&contents[3]), "m9");
        assert_eq!(*model.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compaction_summarizes_oldest() {
        let model = Summarizer { calls: Mutex::new(0), fail: false };
        let mut window = ContextWindow::new(ContextPolicy::Compacting {
            max_messages: 6,
            fraction: 0.5,
        });

        // Under the threshold nothing happens
        let contents = window.prepare(&history(6), &model).await;
        assert_eq!(contents.len(), 6);
        assert!(window.summary().is_none());

        let contents = window.prepare(&history(10), &model).await;
        assert_eq!(*model.calls.lock().unwrap(), 1);
        assert_eq!(window.summary(), Some("they talked"));
        // summary turn + 5 unsummarized messages
        assert_eq!(contents.len(), 6);
        assert!(text_of(&contents[0]).starts_with(SUMMARY_HEADER));
        assert_eq!(text_of(&contents[1]), "m5");
    }

    #[tokio::test]
    async fn test_compaction_failure_falls_back() {
        let model = Summarizer { calls: Mutex::new(0), fail: true };
        let mut window = ContextWindow::new(ContextPolicy::Compacting {
            max_messages: 4,
            fraction: 0.5,
        });

        let contents = window.prepare(&history(10), &model).await;
        assert_eq!(contents.len(), 4);
        assert!(window.summary().is_none());
    }
}
