//! C8 — Form Engine: strategy selection, form lifecycle, submission
//! validation and merge.
//!
//! "plain tool / form-capable / wrapped tool" collapses to a tagged
//! variant ([`crate::tool::ToolCapability`]) resolved by one explicit
//! capability check, per the Design Note in DESIGN.md, rather than
//! scattering `is_some()` checks for independent optional hooks through
//! the caller.

use crate::field_types::FieldTypeRegistry;
use crate::form::{FormMessage, FormSubmission, FROM_FORM_MARKER};
use crate::form_generator::{
    generate_form_from_error, generate_form_from_schema, GenerateFormOptions,
};
use crate::guidance::FieldGuidanceRegistry;
use crate::schema::ObjectSchema;
use crate::tool::{Tool, ToolCapability};
use serde_json::Value as JsonValue;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Which code path produced a given form — named strategies discoverable
/// via [`FormEngine::registered_strategies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStrategy {
    FocusedSchema,
    ErrorDriven,
    RenderConfig,
    SchemaBased,
    None,
}

impl FormStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            FormStrategy::FocusedSchema => "focused_schema",
            FormStrategy::ErrorDriven => "error_driven",
            FormStrategy::RenderConfig => "render_config",
            FormStrategy::SchemaBased => "schema_based",
            FormStrategy::None => "none",
        }
    }
}

const ALL_STRATEGIES: &[FormStrategy] = &[
    FormStrategy::FocusedSchema,
    FormStrategy::ErrorDriven,
    FormStrategy::RenderConfig,
    FormStrategy::SchemaBased,
];

/// `shouldGenerateForm(tool, input)`: `false` if `input.__fromForm` or
/// `input.renderForm === false`; delegated to the tool's hook when
/// form-capable (panics are logged and treated as `false`); otherwise
/// derived from whether the tool's schema rejects the input.
pub fn should_generate_form(tool: &dyn Tool, input: &JsonValue) -> bool {
    if input.get(FROM_FORM_MARKER).and_then(|v| v.as_bool()) == Some(true) {
        return false;
    }
    if input.get("renderForm").and_then(|v| v.as_bool()) == Some(false) {
        return false;
    }
    if let ToolCapability::FormCapable(capable) = tool.capability() {
        let outcome = catch_unwind(AssertUnwindSafe(|| capable.should_generate_form(input)));
        return match outcome {
            Ok(decision) => decision,
            Err(_) => {
                tracing::error!(tool = tool.name(), "shouldGenerateForm hook panicked; treating as false");
                false
            }
        };
    }
    !tool.schema().safe_parse(input).is_ok()
}

fn schema_has_embedded_render_config(schema: &ObjectSchema) -> bool {
    schema.iter().any(|(_, node)| node.ui.is_some())
}

fn select_strategy(tool: &dyn Tool, input: &JsonValue) -> FormStrategy {
    if matches!(tool.capability(), ToolCapability::FormCapable(_)) {
        return FormStrategy::FocusedSchema;
    }
    if !tool.schema().safe_parse(input).is_ok() {
        return FormStrategy::ErrorDriven;
    }
    if schema_has_embedded_render_config(tool.schema()) {
        return FormStrategy::RenderConfig;
    }
    if !tool.schema().is_empty() {
        return FormStrategy::SchemaBased;
    }
    FormStrategy::None
}

/// `{ toolName, parameters }` required; `formId` optional — checked
/// structurally since [`FormSubmission`] already requires the former two
/// at the type level. What remains to validate is the shape of
/// `parameters` itself.
#[derive(Debug, thiserror::Error)]
pub enum FormEngineError {
    #[error("submission parameters must be a JSON object")]
    InvalidParameters,
    #[error("form generation produced no strategy (schema has no fields)")]
    NoApplicableStrategy,
    #[error(transparent)]
    Schema(#[from] crate::error::Error),
}

pub struct FormEngine {
    guidance: Option<FieldGuidanceRegistry>,
    type_registry: FieldTypeRegistry,
    middleware: Vec<String>,
}

impl FormEngine {
    pub fn new(guidance: Option<FieldGuidanceRegistry>, type_registry: FieldTypeRegistry) -> Self {
        Self {
            guidance,
            type_registry,
            middleware: Vec::new(),
        }
    }

    pub fn register_middleware(&mut self, name: impl Into<String>) {
        self.middleware.push(name.into());
    }

    pub fn registered_strategies(&self) -> Vec<&'static str> {
        ALL_STRATEGIES.iter().map(|s| s.name()).collect()
    }

    pub fn registered_middleware(&self) -> Vec<String> {
        self.middleware.clone()
    }

    /// `generateForm(toolName, tool, input, context?)`. Dispatches via
    /// [`select_strategy`]; attaches `jsonSchema`/`uiSchema` and
    /// `partialInput = input` as part of the schema/focused generation
    /// path (handled inside [`generate_form_from_schema`]).
    pub fn generate_form(
        &self,
        tool_name: &str,
        tool: &dyn Tool,
        input: &JsonValue,
        original_prompt: &str,
    ) -> Result<FormMessage, FormEngineError> {
        let strategy = select_strategy(tool, input);
        let result = catch_unwind(AssertUnwindSafe(|| self.generate_form_inner(strategy, tool_name, tool, input, original_prompt)));
        match result {
            Ok(inner) => inner,
            Err(_) => {
                tracing::error!(tool = tool_name, "form generation panicked");
                Err(FormEngineError::NoApplicableStrategy)
            }
        }
    }

    fn generate_form_inner(
        &self,
        strategy: FormStrategy,
        tool_name: &str,
        tool: &dyn Tool,
        input: &JsonValue,
        original_prompt: &str,
    ) -> Result<FormMessage, FormEngineError> {
        match strategy {
            FormStrategy::FocusedSchema => {
                let capable = match tool.capability() {
                    ToolCapability::FormCapable(c) => c,
                    ToolCapability::Plain => unreachable!("strategy selection guarantees form-capability"),
                };
                let focused_schema = match capable.get_form_schema() {
                    Ok(schema) => schema,
                    Err(e) => {
                        tracing::warn!(tool = tool_name, error = %e, "getFormSchema failed, falling back to full schema");
                        tool.schema().clone()
                    }
                };
                let essential = capable.get_essential_fields();
                let missing: Vec<String> = essential
                    .into_iter()
                    .filter(|field| capable.is_field_empty(field, input))
                    .collect();
                let focused = missing.is_empty();
                Ok(generate_form_from_schema(
                    &focused_schema,
                    input,
                    GenerateFormOptions {
                        tool_name,
                        tool_description: Some(tool.description()),
                        focused,
                    },
                    if focused { None } else { Some(&missing) },
                    self.guidance.as_ref(),
                    &self.type_registry,
                    original_prompt,
                ))
            }
            FormStrategy::ErrorDriven => {
                let outcome = tool.schema().safe_parse(input);
                let issues = outcome.issues().to_vec();
                Ok(generate_form_from_error(
                    &issues,
                    tool.schema(),
                    tool_name,
                    original_prompt,
                    input,
                    self.guidance.as_ref(),
                    &self.type_registry,
                ))
            }
            FormStrategy::RenderConfig | FormStrategy::SchemaBased => Ok(generate_form_from_schema(
                tool.schema(),
                input,
                GenerateFormOptions {
                    tool_name,
                    tool_description: Some(tool.description()),
                    focused: false,
                },
                None,
                self.guidance.as_ref(),
                &self.type_registry,
                original_prompt,
            )),
            FormStrategy::None => Err(FormEngineError::NoApplicableStrategy),
        }
    }

    /// `processSubmission(submission, {originalInput?, schema?}?)`:
    /// validates the submission envelope, then merges
    /// `{ ...originalInput, ...submission.parameters, __fromForm: true }`.
    /// Downstream schema re-validation is the caller's responsibility.
    pub fn process_submission(
        &self,
        submission: &FormSubmission,
        original_input: Option<&JsonValue>,
    ) -> Result<JsonValue, FormEngineError> {
        let params = submission
            .parameters
            .as_object()
            .ok_or(FormEngineError::InvalidParameters)?;

        let mut merged = original_input
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        for (key, value) in params {
            merged.insert(key.clone(), value.clone());
        }
        merged.insert(FROM_FORM_MARKER.to_string(), JsonValue::Bool(true));
        Ok(JsonValue::Object(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldNode;
    use async_trait::async_trait;

    struct PlainTool {
        schema: ObjectSchema,
    }

    #[async_trait]
    impl Tool for PlainTool {
        fn name(&self) -> &str {
            "CreateNftTool"
        }
        fn description(&self) -> &str {
            "creates an nft"
        }
        fn schema(&self) -> &ObjectSchema {
            &self.schema
        }
        async fn call(&self, _input: JsonValue) -> anyhow::Result<String> {
            Ok("ok".to_string())
        }
    }

    fn nft_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field("tokenName", FieldNode::string())
            .field("tokenSymbol", FieldNode::string())
            .field("maxSupply", FieldNode::number())
    }

    #[test]
    fn should_generate_form_is_false_when_from_form_marker_present() {
        let tool = PlainTool { schema: nft_schema() };
        let input = serde_json::json!({ "__fromForm": true });
        assert!(!should_generate_form(&tool, &input));
    }

    #[test]
    fn should_generate_form_is_false_for_valid_input() {
        let tool = PlainTool { schema: nft_schema() };
        let input = serde_json::json!({ "tokenName": "T", "tokenSymbol": "TT", "maxSupply": 1 });
        assert!(!should_generate_form(&tool, &input));
    }

    #[test]
    fn should_generate_form_is_true_for_incomplete_input() {
        let tool = PlainTool { schema: nft_schema() };
        let input = serde_json::json!({});
        assert!(should_generate_form(&tool, &input));
    }

    #[test]
    fn end_to_end_scenario_one_form_required_then_completed() {
        let engine = FormEngine::new(None, FieldTypeRegistry::with_defaults());
        let tool = PlainTool { schema: nft_schema() };
        let input = serde_json::json!({});
        let form = engine.generate_form("CreateNftTool", &tool, &input, "create an nft").unwrap();
        let names: Vec<&str> = form.form_config.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["tokenName", "tokenSymbol", "maxSupply"]);
        assert_eq!(form.form_config.title, "Complete Create Nft Information");

        let submission = FormSubmission {
            form_id: form.id.clone(),
            tool_name: "CreateNftTool".to_string(),
            parameters: serde_json::json!({ "tokenName": "T", "tokenSymbol": "TT", "maxSupply": 100 }),
            timestamp: 0,
            context: None,
        };
        let merged = engine.process_submission(&submission, None).unwrap();
        assert_eq!(merged["tokenName"], "T");
        assert_eq!(merged["__fromForm"], true);
    }

    #[test]
    fn process_submission_overrides_original_input_on_key_conflict() {
        let engine = FormEngine::new(None, FieldTypeRegistry::with_defaults());
        let submission = FormSubmission {
            form_id: "form_1_a".to_string(),
            tool_name: "CreateNftTool".to_string(),
            parameters: serde_json::json!({ "tokenName": "New" }),
            timestamp: 0,
            context: None,
        };
        let original = serde_json::json!({ "tokenName": "Old", "tokenSymbol": "TT" });
        let merged = engine.process_submission(&submission, Some(&original)).unwrap();
        assert_eq!(merged["tokenName"], "New");
        assert_eq!(merged["tokenSymbol"], "TT");
    }

    #[test]
    fn process_submission_rejects_non_object_parameters() {
        let engine = FormEngine::new(None, FieldTypeRegistry::with_defaults());
        let submission = FormSubmission {
            form_id: "form_1_a".to_string(),
            tool_name: "CreateNftTool".to_string(),
            parameters: serde_json::json!("not an object"),
            timestamp: 0,
            context: None,
        };
        assert!(matches!(
            engine.process_submission(&submission, None),
            Err(FormEngineError::InvalidParameters)
        ));
    }

    #[test]
    fn registered_strategies_lists_all_named_strategies() {
        let engine = FormEngine::new(None, FieldTypeRegistry::with_defaults());
        assert_eq!(
            engine.registered_strategies(),
            vec!["focused_schema", "error_driven", "render_config", "schema_based"]
        );
    }
}
