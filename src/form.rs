//! Form entities shared by the Form Generator (C7) and Form Engine (C8):
//! form field, form config, and form message.

use crate::field_types::FieldType;
use crate::guidance::ValidationRules;
use crate::schema::SchemaIssue;
use serde_json::Value as JsonValue;

/// `priority ∈ {essential,common,advanced,expert}`. `required ⇒ priority =
/// essential`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Essential,
    Common,
    Advanced,
    Expert,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Essential => "essential",
            Priority::Common => "common",
            Priority::Advanced => "advanced",
            Priority::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "essential" => Some(Priority::Essential),
            "common" => Some(Priority::Common),
            "advanced" => Some(Priority::Advanced),
            "expert" => Some(Priority::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub priority: Priority,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub default_value: Option<JsonValue>,
    pub validation: Option<ValidationRules>,
    pub options: Option<Vec<String>>,
    pub suggestions: Option<Vec<String>>,
    pub warnings: Vec<String>,
    pub contextual_guidance: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FormConfig {
    pub title: String,
    pub description: String,
    pub fields: Vec<FormField>,
    pub submit_label: String,
    pub cancel_label: String,
    pub metadata: JsonValue,
}

/// `id (form_<ts>_<rand>)`; identity spans from generation to successful
/// submission or explicit cancel.
#[derive(Debug, Clone)]
pub struct FormMessage {
    pub id: String,
    pub form_config: FormConfig,
    pub original_prompt: String,
    pub tool_name: String,
    pub validation_errors: Vec<SchemaIssue>,
    pub partial_input: Option<JsonValue>,
    pub json_schema: Option<JsonValue>,
    pub ui_schema: Option<JsonValue>,
}

/// `{ formId, toolName, parameters, timestamp, context? }`.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub form_id: String,
    pub tool_name: String,
    pub parameters: JsonValue,
    pub timestamp: u64,
    pub context: Option<JsonValue>,
}

/// Marker merged into downstream tool input after a submission, to prevent
/// re-entering the form path.
pub const FROM_FORM_MARKER: &str = "__fromForm";

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// `form_<ms-epoch>_<random base36>`.
pub fn generate_form_id() -> String {
    let ts = now_ms();
    let rand: u64 = rand::random();
    format!("form_{ts}_{}", to_base36(rand))
}

fn to_base36(mut n: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}
