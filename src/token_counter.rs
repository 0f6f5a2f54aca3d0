//! C1 — Token Counter: model-aware token counting for strings and chat
//! messages.
//!
//! A model-specific encoder falls back to a known baseline encoder, and
//! falls back further to
//! `ceil(word_count * 1.3)` when encoding a string outright fails. This
//! crate ships the baseline/fallback path as [`HeuristicEncoder`] — always
//! available, holds no native resources — and lets an embedder plug in a
//! real BPE tokenizer via [`TokenEncoder`] without forcing a dependency on
//! any one vendor's implementation.

use crate::chat::ChatMessage;
use async_trait::async_trait;

/// Per-message overhead added on top of raw content
/// tokens: a flat per-message overhead and a flat per-role overhead.
const PER_MESSAGE_OVERHEAD: usize = 3;
const PER_ROLE_OVERHEAD: usize = 1;

/// A pluggable token encoder. `count` may fail (e.g. the encoder's native
/// library choked on malformed input); callers fall back to the
/// word-count heuristic rather than propagating the error.
#[async_trait]
pub trait TokenEncoder: Send + Sync {
    fn model_name(&self) -> &str;
    fn count(&self, text: &str) -> anyhow::Result<usize>;

    /// Release any native resources the encoder holds (e.g. a loaded BPE
    /// vocabulary). The default is a no-op for encoders with nothing to
    /// release, like [`HeuristicEncoder`].
    async fn dispose(&self) {}
}

/// Always-available fallback encoder implementing the named fallback
/// formula: `ceil(word_count * 1.3)`. Also used directly as the
/// "known baseline encoder" when a model-specific encoder is unavailable.
pub struct HeuristicEncoder {
    model_name: String,
}

impl HeuristicEncoder {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }
}

#[async_trait]
impl TokenEncoder for HeuristicEncoder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn count(&self, text: &str) -> anyhow::Result<usize> {
        Ok(heuristic_word_count_tokens(text))
    }
}

fn heuristic_word_count_tokens(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    let word_count = text.split_whitespace().count();
    ((word_count as f64) * 1.3).ceil() as usize
}

/// Baseline model name substituted when the caller's requested model has
/// no dedicated encoder (the "substitute that model name" fallback).
pub const BASELINE_MODEL: &str = "cl100k_base";

pub struct TokenCounter {
    encoder: Box<dyn TokenEncoder>,
    requested_model: String,
}

impl TokenCounter {
    /// Construct a counter using the baseline heuristic encoder, recording
    /// `model` as the requested (but unavailable) model name.
    pub fn new(model: impl Into<String>) -> Self {
        let requested_model = model.into();
        Self {
            encoder: Box::new(HeuristicEncoder::new(BASELINE_MODEL)),
            requested_model,
        }
    }

    /// Construct a counter around a caller-supplied encoder (e.g. a real
    /// BPE tokenizer for a specific model).
    pub fn with_encoder(model: impl Into<String>, encoder: Box<dyn TokenEncoder>) -> Self {
        Self {
            encoder,
            requested_model: model.into(),
        }
    }

    pub fn requested_model(&self) -> &str {
        &self.requested_model
    }

    pub fn active_model(&self) -> &str {
        self.encoder.model_name()
    }

    /// `count(text) -> non-negative integer`. Empty/whitespace-only
    /// strings yield 0. Falls back to the word-count heuristic if
    /// the underlying encoder errors.
    pub fn count(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        match self.encoder.count(text) {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(
                    model = self.encoder.model_name(),
                    error = %e,
                    "token encoder failed, falling back to word-count heuristic"
                );
                heuristic_word_count_tokens(text)
            }
        }
    }

    /// `countMessage(msg) = content-tokens + role-tokens + per-message
    /// overhead (3) + role overhead (1)`.
    pub fn count_message(&self, msg: &ChatMessage) -> usize {
        self.count(&msg.content) + self.count(&msg.role) + PER_MESSAGE_OVERHEAD + PER_ROLE_OVERHEAD
    }

    /// `countMessages(msgs) = sum countMessage`.
    pub fn count_messages(&self, msgs: &[ChatMessage]) -> usize {
        msgs.iter().map(|m| self.count_message(m)).sum()
    }

    /// `estimateSystemPromptTokens(prompt) = count(prompt) +
    /// count("system") + 4`.
    pub fn estimate_system_prompt_tokens(&self, prompt: &str) -> usize {
        self.count(prompt) + self.count("system") + 4
    }

    /// Release any native resources the active encoder holds.
    pub async fn dispose(&self) {
        self.encoder.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_strings_count_zero() {
        let counter = TokenCounter::new("gpt-4");
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("   \n\t "), 0);
    }

    #[test]
    fn heuristic_applies_ceil_1_3_multiplier() {
        let counter = TokenCounter::new("gpt-4");
        // 4 words -> ceil(4 * 1.3) = 6
        assert_eq!(counter.count("one two three four"), 6);
    }

    #[test]
    fn message_counting_includes_fixed_overhead() {
        let counter = TokenCounter::new("gpt-4");
        let msg = ChatMessage::new("user", "one two three four");
        let content_tokens = counter.count("one two three four");
        let role_tokens = counter.count("user");
        assert_eq!(counter.count_message(&msg), content_tokens + role_tokens + 4);
    }

    #[test]
    fn system_prompt_estimate_adds_system_tag_and_four() {
        let counter = TokenCounter::new("gpt-4");
        let prompt = "You are a helpful assistant.";
        let expected = counter.count(prompt) + counter.count("system") + 4;
        assert_eq!(counter.estimate_system_prompt_tokens(prompt), expected);
    }

    #[tokio::test]
    async fn dispose_is_callable_on_heuristic_encoder() {
        let counter = TokenCounter::new("gpt-4");
        counter.dispose().await;
    }
}
