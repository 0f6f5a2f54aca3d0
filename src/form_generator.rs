//! C7 — Form Generator: projects a schema (plus optional validation
//! failure, partial input, and guidance) into a [`FormMessage`] a UI can
//! render.

use crate::field_types::{FieldType, FieldTypeRegistry};
use crate::form::{generate_form_id, FormConfig, FormField, FormMessage, Priority};
use crate::guidance::FieldGuidanceRegistry;
use crate::schema::{FieldKind, FieldNode, ObjectSchema, SchemaIssue};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub struct GenerateFormOptions<'a> {
    pub tool_name: &'a str,
    pub tool_description: Option<&'a str>,
    /// Set when the caller already narrowed `schema` to a focused subset
    /// (e.g. via a form-capable tool's `getFormSchema()`) — all of its
    /// fields are included rather than only the missing-and-required ones.
    pub focused: bool,
}

fn is_missing(input: &JsonValue, name: &str) -> bool {
    match input.get(name) {
        None => true,
        Some(JsonValue::Null) => true,
        _ => false,
    }
}

/// Field selection: an exact pre-calculated set wins outright;
/// otherwise a focused schema includes everything; otherwise only fields
/// missing from `partial_input` AND required by the schema.
fn select_field_names<'a>(
    schema: &'a ObjectSchema,
    partial_input: &JsonValue,
    pre_calculated: Option<&[String]>,
    focused: bool,
) -> Vec<&'a str> {
    let ordered = schema.ordered_field_names();
    if let Some(pre) = pre_calculated {
        return ordered.into_iter().filter(|name| pre.iter().any(|p| p == name)).collect();
    }
    if focused {
        return ordered;
    }
    ordered
        .into_iter()
        .filter(|name| {
            let node = schema.get(name).expect("ordered name must exist in schema");
            node.is_required() && is_missing(partial_input, name)
        })
        .collect()
}

/// Splits camelCase, replaces `_`/`.` with spaces, title-cases each word.
pub fn humanize_label(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    let spaced = spaced.replace(['_', '.'], " ");
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Humanized tool name used in generated titles, with a trailing `Tool`
/// suffix dropped (`CreateNftTool` -> `Create Nft`).
fn tool_display_name(tool_name: &str) -> String {
    let trimmed = tool_name.strip_suffix("Tool").unwrap_or(tool_name);
    humanize_label(trimmed)
}

fn infer_field_type(name: &str, node: &FieldNode, type_registry: &FieldTypeRegistry) -> FieldType {
    if let Some(ui) = &node.ui {
        if let Some(explicit) = &ui.field_type {
            if let Some(parsed) = parse_field_type(explicit) {
                return parsed;
            }
        }
    }
    match &node.kind {
        FieldKind::String => type_registry.detect_type(name).unwrap_or(FieldType::Text),
        FieldKind::Number => match type_registry.detect_type(name) {
            Some(FieldType::Currency) => FieldType::Currency,
            Some(FieldType::Percentage) => FieldType::Percentage,
            _ => FieldType::Number,
        },
        FieldKind::Boolean => FieldType::Checkbox,
        FieldKind::Enum { .. } => FieldType::Select,
        FieldKind::Array { .. } => FieldType::Array,
        FieldKind::Object { .. } => FieldType::Object,
        FieldKind::Union { .. } => type_registry.detect_type(name).unwrap_or(FieldType::Text),
    }
}

fn parse_field_type(s: &str) -> Option<FieldType> {
    match s {
        "text" => Some(FieldType::Text),
        "number" => Some(FieldType::Number),
        "select" => Some(FieldType::Select),
        "checkbox" => Some(FieldType::Checkbox),
        "textarea" => Some(FieldType::Textarea),
        "file" => Some(FieldType::File),
        "array" => Some(FieldType::Array),
        "object" => Some(FieldType::Object),
        "currency" => Some(FieldType::Currency),
        "percentage" => Some(FieldType::Percentage),
        _ => None,
    }
}

fn determine_priority(node: &FieldNode, required: bool) -> Priority {
    if let Some(ui) = &node.ui {
        if let Some(explicit) = &ui.priority {
            if let Some(parsed) = Priority::parse(explicit) {
                return parsed;
            }
        }
    }
    if required {
        return Priority::Essential;
    }
    if let Some(ui) = &node.ui {
        if ui.expert {
            return Priority::Expert;
        }
        if ui.advanced {
            return Priority::Advanced;
        }
    }
    Priority::Common
}

fn build_field(
    name: &str,
    node: &FieldNode,
    guidance_registry: Option<&FieldGuidanceRegistry>,
    type_registry: &FieldTypeRegistry,
    tool_name: &str,
) -> FormField {
    let required = node.is_required();
    let mut field_type = infer_field_type(name, node, type_registry);
    let priority = determine_priority(node, required);
    let guidance = guidance_registry.and_then(|g| g.get_field_guidance(tool_name, name));
    if let Some(g) = &guidance {
        if let Some(override_type) = g.field_type_override {
            field_type = override_type;
        }
    }

    let label = node
        .ui
        .as_ref()
        .and_then(|u| u.label.clone())
        .unwrap_or_else(|| humanize_label(name));
    let placeholder = node.ui.as_ref().and_then(|u| u.placeholder.clone());
    let help_text = node
        .ui
        .as_ref()
        .and_then(|u| u.help_text.clone())
        .or_else(|| node.description.clone());
    let options = match &node.kind {
        FieldKind::Enum { options } => Some(options.clone()),
        _ => guidance.as_ref().and_then(|g| g.predefined_options.clone()),
    };

    FormField {
        name: name.to_string(),
        label,
        field_type,
        required,
        priority,
        placeholder,
        help_text,
        default_value: node.default.clone(),
        validation: guidance.as_ref().and_then(|g| g.validation_rules.clone()),
        options,
        suggestions: guidance.as_ref().and_then(|g| g.suggestions.clone()),
        warnings: guidance.as_ref().map(|g| g.warnings.clone()).unwrap_or_default(),
        contextual_guidance: guidance.as_ref().and_then(|g| g.contextual_help_text.clone()),
    }
}

fn compose_description(required_count: usize, guidance_registry: Option<&FieldGuidanceRegistry>, tool_name: &str) -> String {
    let mut description = if required_count == 0 {
        "Please provide the following information to continue.".to_string()
    } else {
        format!("Please provide the following {required_count} required field(s) to continue.")
    };
    if let Some(global) = guidance_registry.and_then(|g| g.get_global_guidance(tool_name)) {
        if !global.warnings.is_empty() || !global.quality_standards.is_empty() {
            description.push_str("\n\nQuality Guidelines:");
            for warning in &global.warnings {
                description.push_str(&format!("\n- {warning}"));
            }
            for standard in &global.quality_standards {
                description.push_str(&format!("\n- {standard}"));
            }
        }
    }
    description
}

/// `generateFormFromSchema(schema, partialInput, {toolName,
/// toolDescription?}, preCalculatedMissingFields?)`.
pub fn generate_form_from_schema(
    schema: &ObjectSchema,
    partial_input: &JsonValue,
    options: GenerateFormOptions<'_>,
    pre_calculated_missing_fields: Option<&[String]>,
    guidance_registry: Option<&FieldGuidanceRegistry>,
    type_registry: &FieldTypeRegistry,
    original_prompt: &str,
) -> FormMessage {
    let included = select_field_names(schema, partial_input, pre_calculated_missing_fields, options.focused);
    let fields: Vec<FormField> = included
        .iter()
        .map(|name| {
            build_field(
                name,
                schema.get(name).expect("selected name must exist in schema"),
                guidance_registry,
                type_registry,
                options.tool_name,
            )
        })
        .collect();

    let required_count = fields.iter().filter(|f| f.required).count();
    let description = compose_description(required_count, guidance_registry, options.tool_name);
    let title = format!("Complete {} Information", tool_display_name(options.tool_name));

    let field_names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    let priorities: BTreeMap<String, String> = fields
        .iter()
        .map(|f| (f.name.clone(), f.priority.as_str().to_string()))
        .collect();
    let json_schema = schema.to_json_schema_filtered(Some(&field_names));
    let ui_schema = schema.to_ui_schema(&priorities);

    let form_config = FormConfig {
        title,
        description,
        fields,
        submit_label: "Submit".to_string(),
        cancel_label: "Cancel".to_string(),
        metadata: options
            .tool_description
            .map(|d| serde_json::json!({ "toolDescription": d }))
            .unwrap_or_else(|| serde_json::json!({})),
    };

    FormMessage {
        id: generate_form_id(),
        form_config,
        original_prompt: original_prompt.to_string(),
        tool_name: options.tool_name.to_string(),
        validation_errors: Vec::new(),
        partial_input: Some(partial_input.clone()),
        json_schema: Some(json_schema),
        ui_schema: Some(ui_schema),
    }
}

/// `generateFormFromError(zodLikeError, schema, toolName, originalPrompt)`:
/// derives the missing-field set from the validation issues' first path
/// segment (deduplicated, order of first appearance) and attaches the
/// issues to the resulting message.
pub fn generate_form_from_error(
    issues: &[SchemaIssue],
    schema: &ObjectSchema,
    tool_name: &str,
    original_prompt: &str,
    partial_input: &JsonValue,
    guidance_registry: Option<&FieldGuidanceRegistry>,
    type_registry: &FieldTypeRegistry,
) -> FormMessage {
    let mut missing = Vec::new();
    for issue in issues {
        if let Some(field) = issue.path.first() {
            if !missing.contains(field) {
                missing.push(field.clone());
            }
        }
    }
    let mut message = generate_form_from_schema(
        schema,
        partial_input,
        GenerateFormOptions {
            tool_name,
            tool_description: None,
            focused: false,
        },
        Some(&missing),
        guidance_registry,
        type_registry,
        original_prompt,
    );
    message.validation_errors = issues.to_vec();
    message
}

/// `generateJsonSchemaForm(schema, partialInput?, missingFields?)`: the
/// bare JSON Schema + ui-schema projection, without building a full
/// [`FormMessage`].
pub fn generate_json_schema_form(
    schema: &ObjectSchema,
    missing_fields: Option<&[String]>,
) -> (JsonValue, JsonValue) {
    let json_schema = schema.to_json_schema_filtered(missing_fields);
    let priorities = BTreeMap::new();
    let ui_schema = schema.to_ui_schema(&priorities);
    (json_schema, ui_schema)
}
