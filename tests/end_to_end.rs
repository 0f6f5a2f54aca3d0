//! Cross-module scenarios exercising the runtime layer the way an
//! embedding agent loop would: through `FormAwareExecutor` and
//! `MemoryManager` rather than any single module in isolation.

use async_trait::async_trait;
use formflow::chat::ChatMessage;
use formflow::config::{MemoryWindowConfig, ReferenceStoreConfig};
use formflow::content_processor;
use formflow::field_types::FieldTypeRegistry;
use formflow::form_engine::FormEngine;
use formflow::guidance::{FieldGuidance, FieldGuidanceRegistry, GuidanceProvider, ToolConfiguration, ToolPattern};
use formflow::memory::{ContentSource, MemoryManager, SearchOptions, StoreOptions};
use formflow::schema::{FieldNode, ObjectSchema};
use formflow::tool::{Tool, ToolCapability};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

struct EchoTool {
    schema: ObjectSchema,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "EchoTool"
    }
    fn description(&self) -> &str {
        "echoes its input back as a string"
    }
    fn schema(&self) -> &ObjectSchema {
        &self.schema
    }
    async fn call(&self, input: JsonValue) -> anyhow::Result<String> {
        Ok(input.to_string())
    }
    fn capability(&self) -> ToolCapability<'_> {
        ToolCapability::Plain
    }
}

fn echo_schema() -> ObjectSchema {
    ObjectSchema::new().field("message", FieldNode::string())
}

/// Scenario: a tool response carries an oversized text item. The content
/// processor swaps it for a reference, and a later message mentioning that
/// reference resolves back to a preview rather than the raw bytes.
#[tokio::test]
async fn oversized_tool_content_round_trips_through_a_reference() {
    let store_config = ReferenceStoreConfig {
        size_threshold_bytes: 32,
        ..Default::default()
    };
    let store = formflow::memory::ContentReferenceStore::new(store_config);

    let long_report = "quarterly results ".repeat(20);
    let response = serde_json::json!({
        "content": [
            { "type": "text", "text": "ok" },
            { "type": "text", "text": long_report },
        ]
    });

    let (rewritten, errors) = content_processor::process_tool_response(&store, &response, "finance-server", "GetReport").await;
    assert!(errors.is_empty());

    let items = rewritten["content"].as_array().unwrap();
    assert_eq!(items[0]["text"], "ok");
    assert_eq!(items[1]["type"], "content_reference");
    let reference_id = items[1]["referenceId"].as_str().unwrap().to_string();
    assert_eq!(reference_id.chars().count(), 43);

    let mention = format!("see ref://{reference_id} for the full report");
    let resolved = content_processor::resolve_references_in_text(&store, &mention).await;
    assert!(resolved.contains("content,"));
    assert!(!resolved.contains("quarterly results"));

    store.cleanup_reference(&reference_id).await;
    store.perform_cleanup().await;
    let gone = content_processor::resolve_references_in_text(&store, &mention).await;
    assert!(gone.contains("Reference unavailable") || gone.contains("Reference error"));
}

/// Scenario: a long-running conversation stays within its token budget
/// while the unbounded history and durable entity associations retain
/// everything a search or entity lookup might need later.
#[tokio::test]
async fn memory_manager_prunes_the_window_but_keeps_searchable_history() {
    let mut manager = MemoryManager::with_store_config(
        MemoryWindowConfig {
            max_tokens: 200,
            reserve_tokens: 20,
        },
        ReferenceStoreConfig::default(),
    );
    manager.set_system_prompt("you are a helpful assistant");

    manager.add_message(ChatMessage::new("user", "remember that topic Alpha is 0.0.777"));
    for i in 0..40 {
        manager.add_message(ChatMessage::new(
            "user",
            format!("turn {i} with some padding text to consume tokens steadily"),
        ));
    }

    let summary = manager.get_context_summary();
    assert!(summary.message_count < summary.history_count);
    assert!(summary.current_token_count <= 180);

    let found = manager.search_history("topic alpha", &SearchOptions::default());
    assert_eq!(found.len(), 1);

    let reference_id = manager
        .store_entity_association(formflow::memory::EntityAssociation {
            entity_id: "0.0.777".to_string(),
            entity_name: "Topic Alpha".to_string(),
            entity_type: formflow::memory::EntityType::TopicId,
            created_at: 1,
            transaction_id: None,
            session_id: None,
        })
        .await;
    assert_eq!(reference_id.chars().count(), 43);

    let resolved = manager.resolve_entity_reference("0.0.777").expect("entity should resolve");
    assert_eq!(resolved.entity_name, "Topic Alpha");

    manager.dispose().await;
}

struct HouseStyleProvider;
impl GuidanceProvider for HouseStyleProvider {
    fn field_guidance(&self, _tool_name: &str, field_name: &str) -> Option<FieldGuidance> {
        if field_name == "message" {
            Some(FieldGuidance {
                suggestions: Some(vec!["keep it under 280 characters".to_string()]),
                ..Default::default()
            })
        } else {
            None
        }
    }
}

/// Scenario: a static tool configuration and a dynamic provider both have
/// an opinion about the same field; the provider (registered with higher
/// priority) wins on the overlapping suggestion while the static
/// configuration's help text survives because the provider never touched
/// it.
#[tokio::test]
async fn form_generation_merges_static_and_dynamic_guidance() {
    let mut guidance = FieldGuidanceRegistry::new();
    let mut fields = HashMap::new();
    fields.insert(
        "message".to_string(),
        FieldGuidance {
            suggestions: Some(vec!["say hello".to_string()]),
            contextual_help_text: Some("shown to the recipient verbatim".to_string()),
            ..Default::default()
        },
    );
    guidance.register_tool_configuration(ToolConfiguration {
        tool_pattern: ToolPattern::Substring("Echo".to_string()),
        fields,
        global_guidance: None,
    });
    guidance
        .register_tool_provider(ToolPattern::Substring("Echo".to_string()), Arc::new(HouseStyleProvider), None, 10)
        .unwrap();

    let engine = FormEngine::new(Some(guidance), FieldTypeRegistry::with_defaults());
    let tool = EchoTool { schema: echo_schema() };
    let form = engine
        .generate_form("EchoTool", &tool, &serde_json::json!({}), "send a message")
        .unwrap();

    let field = form.form_config.fields.iter().find(|f| f.name == "message").unwrap();
    assert_eq!(field.suggestions, Some(vec!["keep it under 280 characters".to_string()]));
    assert_eq!(field.contextual_guidance, Some("shown to the recipient verbatim".to_string()));
}

/// Scenario: a tool response that isn't valid JSON passes through the
/// formatter unchanged rather than failing the step.
#[tokio::test]
async fn malformed_tool_response_passes_through_the_formatter_unchanged() {
    let exec = {
        let tool: Arc<dyn Tool> = Arc::new(PlainTextTool);
        let engine = FormEngine::new(None, FieldTypeRegistry::with_defaults());
        formflow::executor::FormAwareExecutor::new(vec![tool], engine)
    };

    let step = formflow::chat::PlannerStep::Action(formflow::chat::ToolAction {
        tool: "PlainTextTool".to_string(),
        tool_input: serde_json::json!({ "message": "hi" }),
        log: String::new(),
    });
    let outcome = exec.take_next_step(step, "").await.unwrap();
    match outcome {
        formflow::executor::StepOutcome::Observation(obs) => {
            assert_eq!(obs.output, "not json at all");
            assert!(obs.metadata.is_none());
        }
        formflow::executor::StepOutcome::Finished(_) => panic!("expected an observation"),
    }
}

struct PlainTextTool;

#[async_trait]
impl Tool for PlainTextTool {
    fn name(&self) -> &str {
        "PlainTextTool"
    }
    fn description(&self) -> &str {
        "returns a plain text response"
    }
    fn schema(&self) -> &ObjectSchema {
        static SCHEMA: std::sync::OnceLock<ObjectSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| ObjectSchema::new().field("message", FieldNode::string()))
    }
    async fn call(&self, _input: JsonValue) -> anyhow::Result<String> {
        Ok("not json at all".to_string())
    }
}

/// Scenario: content stored with `no_expiry` under the `AgentGenerated`
/// source survives a cleanup pass while an unrelated, aged-out
/// `McpTool`-sourced entry does not, exercising the source-priority aging
/// policy end to end rather than through a single-field unit test.
#[tokio::test]
async fn cleanup_respects_per_source_policy_priority() {
    let config = ReferenceStoreConfig {
        size_threshold_bytes: 1,
        recent_policy: formflow::config::SourcePolicy {
            max_age_ms: 0,
            priority: 10,
        },
        ..Default::default()
    };
    let store = formflow::memory::ContentReferenceStore::new(config);

    let durable = store
        .store_content(b"keep me around", StoreOptions::with_source(ContentSource::AgentGenerated).no_expiry())
        .await;
    let aged_out = store
        .store_content(b"evict me soon", StoreOptions::with_source(ContentSource::McpTool))
        .await;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store.perform_cleanup().await;

    assert!(store.has_reference(&durable.reference_id).await);
    assert!(!store.has_reference(&aged_out.reference_id).await);
}
