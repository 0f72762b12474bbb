//! Text-to-speech request side
//!
//! Cleans assistant text into something a voice can read and asks the
//! synthesizer for raw PCM audio.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::Result;
use crate::llm::GeminiClient;

/// Default cap on characters sent for synthesis
pub const DEFAULT_SPEECH_CHAR_LIMIT: usize = 1000;

/// Markdown emphasis, heading and code markers
static MARKDOWN_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_#`~]").expect("valid regex"));

/// `[label](target)` links
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));

/// Anything a voice should not try to pronounce (emoji, symbols)
static UNSPEAKABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^A-Za-z0-9_\s.,!?;:'"-]"#).expect("valid regex"));

/// Strip markdown and symbols, then cap the length at `limit` characters
///
/// Link labels are kept, link targets are dropped.
#[must_use]
pub fn clean_for_speech(text: &str, limit: usize) -> String {
    let text = MARKDOWN_MARKERS.replace_all(text, "");
    let text = MARKDOWN_LINK.replace_all(&text, "$1");
    let text = UNSPEAKABLE.replace_all(&text, " ");
    text.trim().chars().take(limit).collect()
}

/// Remote speech synthesis
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return base64 encoded 16-bit PCM
    ///
    /// Returns `Ok(None)` when the service produced no audio.
    ///
    /// # Errors
    ///
    /// Returns error if the credential is missing or the request fails
    async fn synthesize(&self, text: &str) -> Result<Option<String>>;
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<Option<String>> {
        self.synthesize_speech(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_and_links() {
        assert_eq!(
            clean_for_speech("**Hello** [world](http://x.com)!", 1000),
            "Hello world!"
        );
    }

    #[test]
    fn test_strips_headings_and_code() {
        assert_eq!(
            clean_for_speech("## Plan\n`cargo` ~~old~~ _new_", 1000),
            "Plan\ncargo old new"
        );
    }

    #[test]
    fn test_replaces_symbols_with_spaces() {
        assert_eq!(clean_for_speech("Hi 👋 there", 1000), "Hi   there");
        assert_eq!(clean_for_speech("It's 5 o'clock; \"ok\"?", 1000), "It's 5 o'clock; \"ok\"?");
    }

    #[test]
    fn test_truncates_to_limit() {
        let long = "a".repeat(1500);
        assert_eq!(clean_for_speech(&long, 1000).len(), 1000);
        assert_eq!(clean_for_speech("abcdef", 3), "abc");
    }

    #[test]
    fn test_symbols_only_is_empty() {
        assert!(clean_for_speech("*** 🎉 ###", 1000).is_empty());
    }
}
