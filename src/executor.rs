//! C9 — Form-Aware Executor: wraps an agent-style executor and
//! intercepts each planned tool call, routing into the Form Engine when a
//! tool call cannot proceed as-is, and resuming it once the user submits
//! the resulting form.
//!
//! Event emission mirrors the reference runtime's `AgentEvent`/
//! `ServerEvent` pattern generalized away from any particular transport: a
//! plain enum plus an optional `tokio::sync::mpsc` sender an embedding
//! application can subscribe to, with no dependency on a UI framework.

use crate::chat::{ChatMessage, PlannerStep};
use crate::content_processor;
use crate::error::Error;
use crate::form::{FormMessage, FormSubmission};
use crate::form_engine::{self, FormEngine, FormEngineError};
use crate::schema::{ObjectSchema, ParseOutcome};
use crate::tool::Tool;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// `parameterPreprocessingCallback?: (toolName, params) → params'`. Errors
/// are logged at warn and the original params are used.
#[async_trait]
pub trait ParameterPreprocessor: Send + Sync {
    async fn preprocess(&self, tool_name: &str, params: JsonValue) -> anyhow::Result<JsonValue>;
}

/// `{formId, toolName}`, the shape `getPendingFormsInfo` returns.
#[derive(Debug, Clone)]
pub struct PendingFormInfo {
    pub form_id: String,
    pub tool_name: String,
}

/// `Map<formId, {toolName, originalInput, originalToolInput, schema,
/// toolRef}>`. `toolRef` is resolved by name against the executor's own
/// tool registry at submission time rather than carried as a live trait
/// object, so the whole record stays serializable for session export.
#[derive(Debug, Clone)]
pub struct PendingFormRecord {
    pub tool_name: String,
    pub original_agent_input: JsonValue,
    pub original_tool_input: JsonValue,
    pub schema: ObjectSchema,
}

/// Generalizes the reference runtime's `AgentEvent`/`ServerEvent`
/// emission pattern for embedders that want to observe executor activity
/// (e.g. surfacing "form generation triggered" in a UI) without coupling
/// this crate to any transport.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    FormGenerationTriggered { tool_name: String, form_id: String },
    ToolInvoked { tool_name: String },
    FormSubmissionCompleted { form_id: String, tool_name: String },
}

/// What a planned step's non-terminal observation carries: either a form
/// the caller must render (`requires_form`), or a tool's formatted
/// output.
#[derive(Debug, Clone)]
pub struct Observation {
    pub output: String,
    pub requires_form: bool,
    pub form_message: Option<FormMessage>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    Finished(JsonValue),
    Observation(Observation),
}

/// Result of a successful `processFormSubmission`.
#[derive(Debug, Clone)]
pub struct FormSubmissionResult {
    pub output: String,
    pub message: String,
    pub success: bool,
    pub intermediate_steps: Vec<ChatMessage>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Core(#[from] Error),
    #[error(transparent)]
    Form(#[from] FormEngineError),
    #[error(transparent)]
    ToolInvocation(#[from] anyhow::Error),
}

async fn invoke_tool(tool: &dyn Tool, input: JsonValue) -> anyhow::Result<String> {
    // "Original tool" unwrapping convention: a tool that wraps another
    // tool exposes it via `original()`; every `Tool` is directly callable
    // regardless, so there is no "no callable implementation" failure
    // mode to model here (unlike a dynamically-typed host where a wrapped
    // object might expose none of `call`/`executeOriginal`/`_call`).
    match tool.original() {
        Some(original) => original.call(input).await,
        None => tool.call(input).await,
    }
}

pub struct FormAwareExecutor {
    tools: HashMap<String, Arc<dyn Tool>>,
    engine: FormEngine,
    pending_forms: Mutex<HashMap<String, PendingFormRecord>>,
    preprocessor: Option<Arc<dyn ParameterPreprocessor>>,
    events: Option<mpsc::UnboundedSender<ExecutorEvent>>,
}

impl FormAwareExecutor {
    pub fn new(tools: Vec<Arc<dyn Tool>>, engine: FormEngine) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name().to_string(), t)).collect(),
            engine,
            pending_forms: Mutex::new(HashMap::new()),
            preprocessor: None,
            events: None,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn ParameterPreprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Registers a channel the executor publishes [`ExecutorEvent`]s to.
    /// Send failures (no receiver) are ignored; events are best-effort.
    pub fn with_event_sender(mut self, sender: mpsc::UnboundedSender<ExecutorEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    fn emit(&self, event: ExecutorEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    fn tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The per-step flow: pass through a terminal finish, resolve
    /// the tool, redirect into form generation when required, otherwise
    /// preprocess and invoke, formatting the raw response through C10.
    pub async fn take_next_step(
        &self,
        step: PlannerStep,
        original_prompt: &str,
    ) -> Result<StepOutcome, ExecutorError> {
        let action = match step {
            PlannerStep::Finish(value) => return Ok(StepOutcome::Finished(value)),
            PlannerStep::Action(action) => action,
        };

        let tool = self
            .tool(&action.tool)
            .ok_or_else(|| Error::ToolNotFound(action.tool.clone()))?;

        if form_engine::should_generate_form(tool.as_ref(), &action.tool_input) {
            tracing::warn!(tool = %action.tool, "FORM GENERATION TRIGGERED");
            let form = self
                .engine
                .generate_form(&action.tool, tool.as_ref(), &action.tool_input, original_prompt)?;

            let mut pending = self.pending_forms.lock().await;
            pending.insert(
                form.id.clone(),
                PendingFormRecord {
                    tool_name: action.tool.clone(),
                    original_agent_input: action.tool_input.clone(),
                    original_tool_input: action.tool_input.clone(),
                    schema: tool.schema().clone(),
                },
            );
            drop(pending);
            self.emit(ExecutorEvent::FormGenerationTriggered {
                tool_name: action.tool.clone(),
                form_id: form.id.clone(),
            });

            return Ok(StepOutcome::Observation(Observation {
                output: String::new(),
                requires_form: true,
                form_message: Some(form),
                metadata: None,
            }));
        }

        let params = match &self.preprocessor {
            Some(preprocessor) => match preprocessor.preprocess(&action.tool, action.tool_input.clone()).await {
                Ok(processed) => processed,
                Err(e) => {
                    tracing::warn!(tool = %action.tool, error = %e, "parameter preprocessing failed, using original params");
                    action.tool_input.clone()
                }
            },
            None => action.tool_input.clone(),
        };

        let raw = invoke_tool(tool.as_ref(), params).await?;
        self.emit(ExecutorEvent::ToolInvoked { tool_name: action.tool.clone() });

        let metadata = content_processor::extract_hash_link_block(&raw);
        let formatted = content_processor::format_response(&raw);

        Ok(StepOutcome::Observation(Observation {
            output: formatted,
            requires_form: false,
            form_message: None,
            metadata,
        }))
    }

    /// Looks up the pending record by `formId` (missing → fails with the
    /// exact text `Form <id> not found in pending forms`); re-validates
    /// submitted parameters against the stored schema; invokes the tool
    /// with `{ ...originalToolInput, ...parameters, __fromForm: true }`
    /// via [`FormEngine::process_submission`]; clears the pending record
    /// only once invocation succeeds.
    pub async fn process_form_submission(
        &self,
        submission: FormSubmission,
    ) -> Result<FormSubmissionResult, ExecutorError> {
        let record = {
            let pending = self.pending_forms.lock().await;
            pending.get(&submission.form_id).cloned()
        }
        .ok_or_else(|| Error::FormNotPending(submission.form_id.clone()))?;

        if let ParseOutcome::Err(issues) = record.schema.safe_parse(&submission.parameters) {
            return Err(Error::SchemaValidation(issues).into());
        }

        let tool = self
            .tool(&record.tool_name)
            .ok_or_else(|| Error::ToolNotFound(record.tool_name.clone()))?;

        let merged = self
            .engine
            .process_submission(&submission, Some(&record.original_tool_input))?;

        let raw = invoke_tool(tool.as_ref(), merged).await?;

        {
            let mut pending = self.pending_forms.lock().await;
            pending.remove(&submission.form_id);
        }
        self.emit(ExecutorEvent::FormSubmissionCompleted {
            form_id: submission.form_id.clone(),
            tool_name: record.tool_name.clone(),
        });

        let metadata = content_processor::extract_hash_link_block(&raw);
        let output = content_processor::format_response(&raw);

        Ok(FormSubmissionResult {
            output,
            message: "Form submitted successfully.".to_string(),
            success: true,
            intermediate_steps: Vec::new(),
            metadata,
        })
    }

    pub async fn has_pending_forms(&self) -> bool {
        !self.pending_forms.lock().await.is_empty()
    }

    pub async fn get_pending_forms_info(&self) -> Vec<PendingFormInfo> {
        self.pending_forms
            .lock()
            .await
            .iter()
            .map(|(form_id, record)| PendingFormInfo {
                form_id: form_id.clone(),
                tool_name: record.tool_name.clone(),
            })
            .collect()
    }

    /// Exports the full pending-form snapshot for externalized session
    /// persistence.
    pub async fn get_pending_forms(&self) -> HashMap<String, PendingFormRecord> {
        self.pending_forms.lock().await.clone()
    }

    /// Replaces the pending-form map wholesale (e.g. after restoring a
    /// persisted session). Discarding a submission does not happen
    /// implicitly anywhere in this executor — callers own lifecycle
    /// explicitly, including what to do with forms being replaced here.
    pub async fn restore_pending_forms(&self, forms: HashMap<String, PendingFormRecord>) {
        *self.pending_forms.lock().await = forms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ToolAction;
    use crate::field_types::FieldTypeRegistry;
    use crate::schema::FieldNode;

    struct CreateNftTool {
        schema: ObjectSchema,
    }

    #[async_trait]
    impl Tool for CreateNftTool {
        fn name(&self) -> &str {
            "CreateNftTool"
        }
        fn description(&self) -> &str {
            "creates an nft"
        }
        fn schema(&self) -> &ObjectSchema {
            &self.schema
        }
        async fn call(&self, input: JsonValue) -> anyhow::Result<String> {
            Ok(input.to_string())
        }
    }

    fn nft_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field("tokenName", FieldNode::string())
            .field("tokenSymbol", FieldNode::string())
            .field("maxSupply", FieldNode::number())
    }

    fn executor() -> FormAwareExecutor {
        let tool: Arc<dyn Tool> = Arc::new(CreateNftTool { schema: nft_schema() });
        let engine = FormEngine::new(None, FieldTypeRegistry::with_defaults());
        FormAwareExecutor::new(vec![tool], engine)
    }

    #[tokio::test]
    async fn missing_tool_fails_the_step() {
        let exec = executor();
        let step = PlannerStep::Action(ToolAction {
            tool: "NoSuchTool".to_string(),
            tool_input: serde_json::json!({}),
            log: String::new(),
        });
        let err = exec.take_next_step(step, "").await.unwrap_err();
        assert_eq!(err.to_string(), "Tool \"NoSuchTool\" not found");
    }

    #[tokio::test]
    async fn end_to_end_scenario_one_form_required_then_completed() {
        let exec = executor();
        let step = PlannerStep::Action(ToolAction {
            tool: "CreateNftTool".to_string(),
            tool_input: serde_json::json!({}),
            log: String::new(),
        });
        let outcome = exec.take_next_step(step, "create an nft").await.unwrap();
        let (form_id, fields) = match outcome {
            StepOutcome::Observation(obs) => {
                assert!(obs.requires_form);
                let form = obs.form_message.unwrap();
                let names: Vec<String> = form.form_config.fields.iter().map(|f| f.name.clone()).collect();
                (form.id, names)
            }
            StepOutcome::Finished(_) => panic!("expected an observation"),
        };
        assert_eq!(fields, vec!["tokenName", "tokenSymbol", "maxSupply"]);
        assert!(exec.has_pending_forms().await);

        let submission = FormSubmission {
            form_id: form_id.clone(),
            tool_name: "CreateNftTool".to_string(),
            parameters: serde_json::json!({ "tokenName": "T", "tokenSymbol": "TT", "maxSupply": 100 }),
            timestamp: 0,
            context: None,
        };
        let result = exec.process_form_submission(submission).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("__fromForm"));
        assert!(!exec.has_pending_forms().await);
    }

    #[tokio::test]
    async fn submitting_against_an_unknown_form_id_fails_with_the_exact_text() {
        let exec = executor();
        let submission = FormSubmission {
            form_id: "form_1_missing".to_string(),
            tool_name: "CreateNftTool".to_string(),
            parameters: serde_json::json!({}),
            timestamp: 0,
            context: None,
        };
        let err = exec.process_form_submission(submission).await.unwrap_err();
        assert_eq!(err.to_string(), "Form form_1_missing not found in pending forms");
    }

    #[tokio::test]
    async fn pending_forms_round_trip_through_export_and_restore() {
        let exec = executor();
        let step = PlannerStep::Action(ToolAction {
            tool: "CreateNftTool".to_string(),
            tool_input: serde_json::json!({}),
            log: String::new(),
        });
        let outcome = exec.take_next_step(step, "").await.unwrap();
        let form_id = match outcome {
            StepOutcome::Observation(obs) => obs.form_message.unwrap().id,
            _ => panic!("expected an observation"),
        };

        let snapshot = exec.get_pending_forms().await;
        let info = exec.get_pending_forms_info().await;
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].form_id, form_id);

        let restored_exec = executor();
        restored_exec.restore_pending_forms(snapshot).await;
        assert!(restored_exec.has_pending_forms().await);

        let submission = FormSubmission {
            form_id,
            tool_name: "CreateNftTool".to_string(),
            parameters: serde_json::json!({ "tokenName": "T", "tokenSymbol": "TT", "maxSupply": 1 }),
            timestamp: 0,
            context: None,
        };
        let result = restored_exec.process_form_submission(submission).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn valid_input_invokes_the_tool_directly_without_a_form() {
        let exec = executor();
        let step = PlannerStep::Action(ToolAction {
            tool: "CreateNftTool".to_string(),
            tool_input: serde_json::json!({ "tokenName": "T", "tokenSymbol": "TT", "maxSupply": 1 }),
            log: String::new(),
        });
        let outcome = exec.take_next_step(step, "").await.unwrap();
        match outcome {
            StepOutcome::Observation(obs) => assert!(!obs.requires_form),
            StepOutcome::Finished(_) => panic!("expected an observation"),
        }
        assert!(!exec.has_pending_forms().await);
    }
}
