//! C2 — Memory Window: a token-bounded ordered sequence of chat messages
//! with batched pruning.

use crate::chat::ChatMessage;
use crate::token_counter::TokenCounter;

/// Optional importance hint an embedder can attach to a message. Purely
/// additive metadata surfaced for callers that want to inspect it later
/// (e.g. before deciding what to do with pruned messages); it does not
/// change which messages get pruned — the pruning policy is strictly
/// oldest-first in batches of 2, independent of importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Importance {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl Default for Importance {
    fn default() -> Self {
        Importance::Normal
    }
}

struct Entry {
    message: ChatMessage,
    importance: Importance,
    tokens: usize,
}

pub struct AddMessageResult {
    pub added: bool,
    pub pruned_messages: Vec<ChatMessage>,
    pub current_token_count: usize,
    pub remaining_capacity: usize,
}

/// Hard stop: a single `addMessage` call will never prune more than this
/// many messages, even if the window is still over budget afterward.
const MAX_PRUNE_PER_CALL: usize = 1000;

/// Messages are pruned in batches of this size to keep human/AI turn
/// pairs together.
const PRUNE_BATCH_SIZE: usize = 2;

pub struct MemoryWindow {
    max_tokens: usize,
    reserve_tokens: usize,
    system_prompt: Option<String>,
    system_prompt_tokens: usize,
    entries: Vec<Entry>,
    counter: TokenCounter,
}

impl MemoryWindow {
    pub fn new(max_tokens: usize, reserve_tokens: usize, counter: TokenCounter) -> Self {
        assert!(
            reserve_tokens < max_tokens,
            "reserveTokens must be smaller than maxTokens"
        );
        Self {
            max_tokens,
            reserve_tokens,
            system_prompt: None,
            system_prompt_tokens: 0,
            entries: Vec::new(),
            counter,
        }
    }

    fn budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserve_tokens)
    }

    pub fn max_tokens_snapshot(&self) -> usize {
        self.max_tokens
    }

    pub fn reserve_tokens_snapshot(&self) -> usize {
        self.reserve_tokens
    }

    /// `currentTokenCount = systemPromptTokens + sum messageTokens`.
    pub fn current_token_count(&self) -> usize {
        self.system_prompt_tokens + self.entries.iter().map(|e| e.tokens).sum::<usize>()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.budget().saturating_sub(self.current_token_count())
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.system_prompt_tokens = self.counter.estimate_system_prompt_tokens(&prompt);
        self.system_prompt = Some(prompt);
    }

    pub fn get_messages(&self) -> Vec<ChatMessage> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn update_limits(&mut self, max_tokens: usize, reserve_tokens: usize) {
        assert!(
            reserve_tokens < max_tokens,
            "reserveTokens must be smaller than maxTokens"
        );
        self.max_tokens = max_tokens;
        self.reserve_tokens = reserve_tokens;
    }

    /// Whether `msg` could be accepted on its own terms: its own token
    /// count must not exceed `maxTokens` (the rejection rule).
    pub fn can_add_message(&self, msg: &ChatMessage) -> bool {
        self.counter.count_message(msg) <= self.max_tokens
    }

    pub fn add_message(&mut self, msg: ChatMessage) -> AddMessageResult {
        self.add_message_with_importance(msg, Importance::default())
    }

    pub fn add_message_with_importance(
        &mut self,
        msg: ChatMessage,
        importance: Importance,
    ) -> AddMessageResult {
        let tokens = self.counter.count_message(&msg);
        if tokens > self.max_tokens {
            return AddMessageResult {
                added: false,
                pruned_messages: Vec::new(),
                current_token_count: self.current_token_count(),
                remaining_capacity: self.remaining_capacity(),
            };
        }

        self.entries.push(Entry {
            message: msg,
            importance,
            tokens,
        });

        let pruned_messages = self.prune_to_fit();

        AddMessageResult {
            added: true,
            pruned_messages,
            current_token_count: self.current_token_count(),
            remaining_capacity: self.remaining_capacity(),
        }
    }

    /// Remove oldest messages in batches of 2 until under the token
    /// budget, or until the hard per-call removal stop, or until only the
    /// single most recent message remains (the invariant escape
    /// hatch — a single oversized-but-latest message is kept regardless).
    pub fn prune_to_fit(&mut self) -> Vec<ChatMessage> {
        let mut pruned = Vec::new();
        let budget = self.budget();

        while self.current_token_count() > budget
            && self.entries.len() > 1
            && pruned.len() < MAX_PRUNE_PER_CALL
        {
            let batch = PRUNE_BATCH_SIZE.min(self.entries.len() - 1).min(MAX_PRUNE_PER_CALL - pruned.len());
            if batch == 0 {
                break;
            }
            let removed: Vec<Entry> = self.entries.drain(0..batch).collect();
            for e in removed {
                tracing::info!(
                    tokens = e.tokens,
                    "pruned message from memory window"
                );
                pruned.push(e.message);
            }
        }

        pruned
    }

    /// Releases the underlying token counter's encoder resources. The
    /// window itself owns no other disposable state.
    pub async fn dispose(&self) {
        self.counter.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_counter::TokenCounter;

    fn window(max_tokens: usize, reserve_tokens: usize) -> MemoryWindow {
        MemoryWindow::new(max_tokens, reserve_tokens, TokenCounter::new("gpt-4"))
    }

    #[test]
    fn rejects_message_exceeding_max_tokens_on_its_own() {
        let mut w = window(100, 10);
        let huge = ChatMessage::new("user", "word ".repeat(200));
        let result = w.add_message(huge);
        assert!(!result.added);
        assert!(w.get_messages().is_empty());
    }

    #[test]
    fn prunes_oldest_in_batches_of_two_to_stay_under_budget() {
        let mut w = window(100, 10);
        for i in 0..30 {
            w.add_message(ChatMessage::new("user", format!("message number {i} with some padding words")));
        }
        assert!(w.current_token_count() <= 90);
        assert!(w.get_messages().len() % 2 == 0 || w.get_messages().len() <= 1);
    }

    #[test]
    fn invariant_holds_after_every_add() {
        let mut w = window(150, 20);
        for i in 0..50 {
            let r = w.add_message(ChatMessage::new("assistant", format!("turn {i} hello there world")));
            if r.added {
                assert!(
                    w.current_token_count() <= 130 || w.get_messages().len() == 1,
                    "budget invariant violated at iteration {i}"
                );
            }
        }
    }

    #[test]
    fn pruned_messages_are_returned_in_original_order() {
        let mut w = window(60, 5);
        let mut last_pruned = Vec::new();
        for i in 0..10 {
            let r = w.add_message(ChatMessage::new("user", format!("entry {i} padding text here now")));
            if !r.pruned_messages.is_empty() {
                last_pruned = r.pruned_messages;
            }
        }
        if last_pruned.len() >= 2 {
            assert!(last_pruned[0].content.contains("entry 0") || last_pruned[0].content < last_pruned[1].content);
        }
    }
}
