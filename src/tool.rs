//! The "Tool" external contract: `{ name, description, schema,
//! call(input)->string }`, optionally implementing the form-capable
//! interface, and an "original tool" unwrapping convention for wrapped
//! tools.
//!
//! Rather than scattering `is_some()` checks for independent optional
//! hooks through the executor, "plain tool / form-capable / wrapped tool"
//! resolves to one tagged variant ([`ToolCapability`]) produced by a
//! single explicit capability check (`Tool::capability`).

use crate::schema::ObjectSchema;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// What `Tool::capability` reports about a tool instance. `Plain` tools
/// always execute; `FormCapable` tools get a chance to redirect into the
/// Form Engine first.
pub enum ToolCapability<'a> {
    Plain,
    FormCapable(&'a dyn FormCapableTool),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> &ObjectSchema;

    async fn call(&self, input: JsonValue) -> anyhow::Result<String>;

    /// Defaults to `Plain`; a tool implementing [`FormCapableTool`]
    /// overrides this to return `FormCapable(self)`.
    fn capability(&self) -> ToolCapability<'_> {
        ToolCapability::Plain
    }

    /// The "original tool" unwrapping convention: a tool that wraps
    /// another tool (e.g. to add logging, caching, or permission checks)
    /// exposes the wrapped instance here so the executor's invocation
    /// fallback chain (`originalTool.call`, `executeOriginal`, `call`,
    /// `_call`) has something concrete to reach for.
    fn original(&self) -> Option<&dyn Tool> {
        None
    }
}

/// The form-capable interface: a tool that can declare a focused subset
/// of its own schema for form generation instead of having the Form
/// Generator infer one from a validation error.
pub trait FormCapableTool: Tool {
    /// `false` if `input.__fromForm` or `input.renderForm === false`;
    /// callers delegate this to the tool rather than recomputing it.
    fn should_generate_form(&self, input: &JsonValue) -> bool;

    /// A narrower schema covering only the fields this tool wants filled.
    /// Errors are treated as "fall back to the tool's full schema" by
    /// callers (the step 3).
    fn get_form_schema(&self) -> anyhow::Result<ObjectSchema>;

    /// Field names the tool considers essential for a minimal, useful
    /// form — narrower than "all required fields" when the tool knows
    /// some required fields have good defaults worth deferring.
    fn get_essential_fields(&self) -> Vec<String>;

    /// Whether a named field counts as "empty" in `input` — lets a tool
    /// define emptiness beyond plain JSON absence (e.g. an empty array or
    /// blank string should also count).
    fn is_field_empty(&self, field: &str, input: &JsonValue) -> bool;
}

/// Lightweight, serializable summary of a tool, independent of the live
/// `dyn Tool` — used anywhere a name/description pair needs to cross an
/// API boundary without dragging the trait object along.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

impl ToolDescriptor {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
        }
    }
}
