//! C4 — Smart Memory Manager: composes the token counter, the bounded
//! active window, and the content reference store into one conversation
//! memory surface, and layers an unbounded searchable history plus entity
//! association tracking on top.

use crate::chat::ChatMessage;
use crate::config::{MemoryWindowConfig, ReferenceStoreConfig};
use crate::memory::entity::{self, EntityAssociation, EntityType};
use crate::memory::reference_store::{ContentReferenceStore, ContentSource, StoreOptions};
use crate::memory::window::{AddMessageResult, Importance, MemoryWindow};
use crate::token_counter::TokenCounter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedMessage {
    pub message: ChatMessage,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub limit: Option<usize>,
    pub use_regex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedState {
    pub active_messages: Vec<ChatMessage>,
    pub history: Vec<TimestampedMessage>,
    pub entity_associations: Vec<EntityAssociation>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub message_count: usize,
    pub history_count: usize,
    pub entity_count: usize,
    pub current_token_count: usize,
    pub remaining_capacity: usize,
}

/// Composes C1–C3: `window` governs what the planner sees on its
/// next turn, `history` is the unbounded record searched by
/// `searchHistory`/time-range queries, and `store` holds large payloads
/// addressed by reference. Entity associations are recorded in both the
/// active window (as a system message, for immediate recall) and the
/// reference store (for durable cross-session lookup), per the dual
/// storage requirement.
pub struct MemoryManager {
    window: MemoryWindow,
    history: Vec<TimestampedMessage>,
    entity_associations: Vec<EntityAssociation>,
    store: Arc<ContentReferenceStore>,
    system_prompt: Option<String>,
}

impl MemoryManager {
    pub fn new(window_config: MemoryWindowConfig, store: Arc<ContentReferenceStore>) -> Self {
        let counter = TokenCounter::new("gpt-4");
        Self {
            window: MemoryWindow::new(window_config.max_tokens, window_config.reserve_tokens, counter),
            history: Vec::new(),
            entity_associations: Vec::new(),
            store,
            system_prompt: None,
        }
    }

    pub fn with_store_config(window_config: MemoryWindowConfig, store_config: ReferenceStoreConfig) -> Self {
        Self::new(window_config, Arc::new(ContentReferenceStore::new(store_config)))
    }

    pub fn store(&self) -> Arc<ContentReferenceStore> {
        Arc::clone(&self.store)
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.window.set_system_prompt(prompt.clone());
        self.system_prompt = Some(prompt);
    }

    pub fn add_message(&mut self, message: ChatMessage) -> AddMessageResult {
        self.add_message_with_importance(message, Importance::default())
    }

    pub fn add_message_with_importance(
        &mut self,
        message: ChatMessage,
        importance: Importance,
    ) -> AddMessageResult {
        self.history.push(TimestampedMessage {
            message: message.clone(),
            timestamp: now_ms(),
        });
        self.window.add_message_with_importance(message, importance)
    }

    pub fn get_messages(&self) -> Vec<ChatMessage> {
        self.window.get_messages()
    }

    /// Drops the active window and, when `clear_storage` is set, the
    /// unbounded history and entity association index as well. The
    /// content reference store itself is addressed independently and is
    /// left untouched — callers that also want its entries gone resolve
    /// and clean them up through its own eviction path.
    pub fn clear(&mut self, clear_storage: bool) {
        self.window = MemoryWindow::new(
            self.window.max_tokens_snapshot(),
            self.window.reserve_tokens_snapshot(),
            TokenCounter::new("gpt-4"),
        );
        if let Some(prompt) = &self.system_prompt {
            self.window.set_system_prompt(prompt.clone());
        }
        if clear_storage {
            self.history.clear();
            self.entity_associations.clear();
        }
    }

    pub fn search_history(&self, query: &str, options: &SearchOptions) -> Vec<TimestampedMessage> {
        let matches: Box<dyn Fn(&str) -> bool> = if options.use_regex {
            let pattern = if options.case_sensitive {
                regex::Regex::new(query)
            } else {
                regex::RegexBuilder::new(query).case_insensitive(true).build()
            };
            match pattern {
                Ok(re) => Box::new(move |content: &str| re.is_match(content)),
                Err(_) => Box::new(|_: &str| false),
            }
        } else if options.case_sensitive {
            let needle = query.to_string();
            Box::new(move |content: &str| content.contains(&needle))
        } else {
            let needle = query.to_lowercase();
            Box::new(move |content: &str| content.to_lowercase().contains(&needle))
        };

        let mut results: Vec<TimestampedMessage> = self
            .history
            .iter()
            .filter(|entry| matches(&entry.message.content))
            .cloned()
            .collect();

        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        results
    }

    pub fn get_recent_history(&self, n: usize) -> Vec<TimestampedMessage> {
        let start = self.history.len().saturating_sub(n);
        self.history[start..].to_vec()
    }

    pub fn get_history_by_type(&self, role: &str) -> Vec<TimestampedMessage> {
        self.history
            .iter()
            .filter(|entry| entry.message.role == role)
            .cloned()
            .collect()
    }

    pub fn get_history_from_time_range(&self, start_ms: u64, end_ms: u64) -> Vec<TimestampedMessage> {
        self.history
            .iter()
            .filter(|entry| entry.timestamp >= start_ms && entry.timestamp <= end_ms)
            .cloned()
            .collect()
    }

    pub fn get_recent_history_by_time(&self, within_last_ms: u64) -> Vec<TimestampedMessage> {
        let cutoff = now_ms().saturating_sub(within_last_ms);
        self.history
            .iter()
            .filter(|entry| entry.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Records an entity association both as a system message in the
    /// active window (for immediate recall in the next planner turn) and
    /// durably in the content reference store. Returns the stored
    /// reference id.
    pub async fn store_entity_association(&mut self, association: EntityAssociation) -> String {
        let serialized = association.serialize();
        self.window
            .add_message_with_importance(ChatMessage::new("system", serialized.clone()), Importance::High);
        let reference = self
            .store
            .store_content(
                serialized.as_bytes(),
                StoreOptions::with_source(ContentSource::AgentGenerated).no_expiry(),
            )
            .await;
        self.entity_associations.push(association);
        reference.reference_id
    }

    /// Resolves `query` against tracked entity associations: an exact
    /// `0.0.NNNN`-style id looks up by `entityId` directly; anything else
    /// falls back to a case-insensitive substring match against
    /// `entityName`. Ties are broken by [`entity::dedupe_most_recent`].
    pub fn resolve_entity_reference(&self, query: &str) -> Option<EntityAssociation> {
        let candidates: Vec<EntityAssociation> = if entity::looks_like_exact_id(query) {
            self.entity_associations
                .iter()
                .filter(|a| a.entity_id == query)
                .cloned()
                .collect()
        } else {
            let needle = query.to_lowercase();
            self.entity_associations
                .iter()
                .filter(|a| a.entity_name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        };
        entity::dedupe_most_recent(candidates).into_iter().next()
    }

    pub fn get_entity_associations(&self, entity_type: Option<EntityType>) -> Vec<EntityAssociation> {
        let filtered: Vec<EntityAssociation> = self
            .entity_associations
            .iter()
            .filter(|a| entity_type.map(|t| t == a.entity_type).unwrap_or(true))
            .cloned()
            .collect();
        entity::dedupe_most_recent(filtered)
    }

    pub fn export_state(&self) -> ExportedState {
        ExportedState {
            active_messages: self.window.get_messages(),
            history: self.history.clone(),
            entity_associations: self.entity_associations.clone(),
            system_prompt: self.system_prompt.clone(),
        }
    }

    pub fn get_context_summary(&self) -> ContextSummary {
        ContextSummary {
            message_count: self.window.get_messages().len(),
            history_count: self.history.len(),
            entity_count: self.entity_associations.len(),
            current_token_count: self.window.current_token_count(),
            remaining_capacity: self.window.remaining_capacity(),
        }
    }

    /// Tears down in window -> store -> counter order: the active
    /// window itself holds nothing to release, the reference store's
    /// background cleanup task is stopped next, and the token counter
    /// the window owns is released last via `MemoryWindow::dispose`.
    pub async fn dispose(&self) {
        self.store.stop_auto_cleanup().await;
        self.window.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::entity::EntityType;

    fn manager() -> MemoryManager {
        MemoryManager::with_store_config(MemoryWindowConfig::default(), ReferenceStoreConfig::default())
    }

    #[test]
    fn search_history_is_case_insensitive_by_default() {
        let mut m = manager();
        m.add_message(ChatMessage::new("user", "Tell me about Topic Alpha"));
        let results = m.search_history("topic alpha", &SearchOptions::default());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn search_history_respects_limit() {
        let mut m = manager();
        for i in 0..5 {
            m.add_message(ChatMessage::new("user", format!("ping {i}")));
        }
        let results = m.search_history(
            "ping",
            &SearchOptions {
                limit: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn history_by_type_filters_by_role() {
        let mut m = manager();
        m.add_message(ChatMessage::new("user", "hi"));
        m.add_message(ChatMessage::new("assistant", "hello"));
        assert_eq!(m.get_history_by_type("assistant").len(), 1);
    }

    #[tokio::test]
    async fn entity_resolution_prefers_exact_id_match() {
        let mut m = manager();
        m.store_entity_association(EntityAssociation {
            entity_id: "0.0.500".into(),
            entity_name: "My Topic".into(),
            entity_type: EntityType::TopicId,
            created_at: 1,
            transaction_id: None,
            session_id: None,
        })
        .await;
        let resolved = m.resolve_entity_reference("0.0.500").expect("should resolve");
        assert_eq!(resolved.entity_name, "My Topic");
    }

    #[tokio::test]
    async fn entity_resolution_falls_back_to_name_substring() {
        let mut m = manager();
        m.store_entity_association(EntityAssociation {
            entity_id: "0.0.501".into(),
            entity_name: "Quarterly Report".into(),
            entity_type: EntityType::Topic,
            created_at: 1,
            transaction_id: None,
            session_id: None,
        })
        .await;
        let resolved = m.resolve_entity_reference("quarterly").expect("should resolve");
        assert_eq!(resolved.entity_id, "0.0.501");
    }

    #[test]
    fn clear_without_storage_keeps_history() {
        let mut m = manager();
        m.add_message(ChatMessage::new("user", "hi"));
        m.clear(false);
        assert!(m.get_messages().is_empty());
        assert_eq!(m.get_context_summary().history_count, 1);
    }
}
