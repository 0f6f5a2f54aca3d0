//! Entity association records: a system-message record linking a chain
//! entity id to a user-visible name and type, retained across pruning for
//! natural-language recall.

use serde::{Deserialize, Serialize};

/// The canonical entity-type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Topic,
    TopicId,
    Token,
    TokenId,
    Account,
    AccountId,
    Contract,
    ContractId,
    File,
    FileId,
    Schedule,
    ScheduleId,
}

impl EntityType {
    /// Canonicalizes loose caller input ("topic", "Topic ID", "topicId",
    /// ...) down to the registry's fixed set.
    pub fn canonicalize(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "topic" => Some(EntityType::Topic),
            "topicid" => Some(EntityType::TopicId),
            "token" => Some(EntityType::Token),
            "tokenid" => Some(EntityType::TokenId),
            "account" => Some(EntityType::Account),
            "accountid" => Some(EntityType::AccountId),
            "contract" => Some(EntityType::Contract),
            "contractid" => Some(EntityType::ContractId),
            "file" => Some(EntityType::File),
            "fileid" => Some(EntityType::FileId),
            "schedule" => Some(EntityType::Schedule),
            "scheduleid" => Some(EntityType::ScheduleId),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            EntityType::Topic | EntityType::TopicId => "topic",
            EntityType::Token | EntityType::TokenId => "token",
            EntityType::Account | EntityType::AccountId => "account",
            EntityType::Contract | EntityType::ContractId => "contract",
            EntityType::File | EntityType::FileId => "file",
            EntityType::Schedule | EntityType::ScheduleId => "schedule",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAssociation {
    pub entity_id: String,
    pub entity_name: String,
    pub entity_type: EntityType,
    pub created_at: u64,
    pub transaction_id: Option<String>,
    pub session_id: Option<String>,
}

impl EntityAssociation {
    /// Serializes into the system-typed record content stored both in the
    /// active window and in the reference store's message index.
    pub fn serialize(&self) -> String {
        serde_json::json!({
            "kind": "entity_association",
            "entityId": self.entity_id,
            "entityName": self.entity_name,
            "entityType": self.entity_type,
            "createdAt": self.created_at,
            "transactionId": self.transaction_id,
            "sessionId": self.session_id,
        })
        .to_string()
    }

    pub fn deserialize(content: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(content).ok()?;
        if value.get("kind").and_then(|k| k.as_str()) != Some("entity_association") {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Exact chain-id pattern used by `resolveEntityReference` to decide
/// between an id-only lookup and a substring search.
pub fn looks_like_exact_id(query: &str) -> bool {
    let mut parts = query.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("0"), Some("0"), Some(rest), None) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// De-duplicates associations sharing an `entityId`: most recent wins; on
/// a timestamp tie, the record carrying a transaction id wins (the
/// resolved Open Question — see DESIGN.md).
pub fn dedupe_most_recent(associations: Vec<EntityAssociation>) -> Vec<EntityAssociation> {
    use std::collections::HashMap;
    let mut best: HashMap<String, EntityAssociation> = HashMap::new();
    for assoc in associations {
        match best.get(&assoc.entity_id) {
            None => {
                best.insert(assoc.entity_id.clone(), assoc);
            }
            Some(existing) => {
                let replace = match assoc.created_at.cmp(&existing.created_at) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => {
                        assoc.transaction_id.is_some() && existing.transaction_id.is_none()
                    }
                };
                if replace {
                    best.insert(assoc.entity_id.clone(), assoc);
                }
            }
        }
    }
    let mut out: Vec<EntityAssociation> = best.into_values().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_loose_entity_type_spellings() {
        assert_eq!(EntityType::canonicalize("Topic ID"), Some(EntityType::TopicId));
        assert_eq!(EntityType::canonicalize("tokenId"), Some(EntityType::TokenId));
        assert_eq!(EntityType::canonicalize("nonsense"), None);
    }

    #[test]
    fn exact_id_pattern_matches_only_account_style_ids() {
        assert!(looks_like_exact_id("0.0.123"));
        assert!(!looks_like_exact_id("0.0.abc"));
        assert!(!looks_like_exact_id("my topic"));
    }

    #[test]
    fn dedupe_prefers_most_recent_then_transaction_id_on_tie() {
        let assocs = vec![
            EntityAssociation {
                entity_id: "0.0.1".into(),
                entity_name: "Old".into(),
                entity_type: EntityType::Topic,
                created_at: 100,
                transaction_id: None,
                session_id: None,
            },
            EntityAssociation {
                entity_id: "0.0.1".into(),
                entity_name: "Tied-no-tx".into(),
                entity_type: EntityType::Topic,
                created_at: 200,
                transaction_id: None,
                session_id: None,
            },
            EntityAssociation {
                entity_id: "0.0.1".into(),
                entity_name: "Tied-with-tx".into(),
                entity_type: EntityType::Topic,
                created_at: 200,
                transaction_id: Some("tx-1".into()),
                session_id: None,
            },
        ];
        let deduped = dedupe_most_recent(assocs);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].entity_name, "Tied-with-tx");
    }
}
