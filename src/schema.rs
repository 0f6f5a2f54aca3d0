//! The "schema validator" external contract: a structured type system
//! with per-field typing, optionality/default/nullable, a safe-parse sum
//! type, and a draft-7 JSON Schema projection.
//!
//! A schema validator is treated as a consumed contract here, not
//! something this crate owns. Rust has no single de-facto dynamic schema
//! library playing that role, so this module ships one concrete,
//! serde-friendly implementation ([`ObjectSchema`]) that the rest of the
//! crate's form machinery is written against. Embedders with a different
//! schema system can implement the same shape and skip this module
//! entirely — nothing downstream requires `ObjectSchema` by name, only its
//! public behavior.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// One validation failure, mirroring a Zod issue: a path into the input,
/// a stable code, and a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: Vec<String>,
    pub code: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn required(field: &str) -> Self {
        Self {
            path: vec![field.to_string()],
            code: "required".to_string(),
            message: format!("'{field}' is required"),
        }
    }

    pub fn invalid_type(field: &str, expected: &str) -> Self {
        Self {
            path: vec![field.to_string()],
            code: "invalid_type".to_string(),
            message: format!("'{field}' must be {expected}"),
        }
    }
}

/// Sum type result of a safe-parse call: `ok` or `err(issues)`, never a
/// thrown exception — schema validation is data, not control flow.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Ok(JsonValue),
    Err(Vec<SchemaIssue>),
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ParseOutcome::Ok(_))
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            ParseOutcome::Ok(_) => &[],
            ParseOutcome::Err(issues) => issues,
        }
    }
}

/// Base type tag for a field: string/number/boolean/enum/array/object,
/// with nested object/union support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Enum { options: Vec<String> },
    Array { item: Box<FieldNode> },
    Object { schema: Box<ObjectSchema> },
    Union { variants: Vec<FieldNode> },
}

/// UI/render-config hints that may be embedded directly on a schema
/// field. These are advisory: the Form Generator treats them as the
/// highest-precedence source for type and priority, but a field with no
/// `ui` still gets a fully inferred form entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRenderConfig {
    pub field_type: Option<String>,
    pub priority: Option<String>,
    pub label: Option<String>,
    pub help_text: Option<String>,
    pub placeholder: Option<String>,
    #[serde(default)]
    pub advanced: bool,
    #[serde(default)]
    pub expert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNode {
    pub kind: FieldKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub ui: Option<FieldRenderConfig>,
    /// Free-form description, propagated into generated forms' help text
    /// when no other guidance source supplies one.
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldNode {
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }
    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }
    pub fn enum_of(options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(FieldKind::Enum {
            options: options.into_iter().map(Into::into).collect(),
        })
    }
    pub fn array(item: FieldNode) -> Self {
        Self::new(FieldKind::Array { item: Box::new(item) })
    }
    pub fn object(schema: ObjectSchema) -> Self {
        Self::new(FieldKind::Object { schema: Box::new(schema) })
    }

    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            default: None,
            ui: None,
            description: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, value: JsonValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_ui(mut self, ui: FieldRenderConfig) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// `required(f) ⇔ S has f AND S.f is not optional, not nullable, and
    /// has no default`.
    pub fn is_required(&self) -> bool {
        !self.optional && !self.nullable && self.default.is_none()
    }

    fn type_name(&self) -> &'static str {
        match &self.kind {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum { .. } => "enum",
            FieldKind::Array { .. } => "array",
            FieldKind::Object { .. } => "object",
            FieldKind::Union { .. } => "union",
        }
    }

    fn validate(&self, field_name: &str, value: &JsonValue, issues: &mut Vec<SchemaIssue>) {
        if value.is_null() {
            if self.nullable {
                return;
            }
            issues.push(SchemaIssue::invalid_type(field_name, self.type_name()));
            return;
        }
        match &self.kind {
            FieldKind::String => {
                if !value.is_string() {
                    issues.push(SchemaIssue::invalid_type(field_name, "a string"));
                }
            }
            FieldKind::Number => {
                if !value.is_number() {
                    issues.push(SchemaIssue::invalid_type(field_name, "a number"));
                }
            }
            FieldKind::Boolean => {
                if !value.is_boolean() {
                    issues.push(SchemaIssue::invalid_type(field_name, "a boolean"));
                }
            }
            FieldKind::Enum { options } => match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => {}
                _ => issues.push(SchemaIssue {
                    path: vec![field_name.to_string()],
                    code: "invalid_enum".to_string(),
                    message: format!("'{field_name}' must be one of {options:?}"),
                }),
            },
            FieldKind::Array { item } => match value.as_array() {
                Some(items) => {
                    for (i, entry) in items.iter().enumerate() {
                        item.validate(&format!("{field_name}[{i}]"), entry, issues);
                    }
                }
                None => issues.push(SchemaIssue::invalid_type(field_name, "an array")),
            },
            FieldKind::Object { schema } => match value.as_object() {
                Some(_) => {
                    let nested = schema.safe_parse(value);
                    for issue in nested.issues() {
                        let mut path = vec![field_name.to_string()];
                        path.extend(issue.path.clone());
                        issues.push(SchemaIssue {
                            path,
                            code: issue.code.clone(),
                            message: issue.message.clone(),
                        });
                    }
                }
                None => issues.push(SchemaIssue::invalid_type(field_name, "an object")),
            },
            FieldKind::Union { variants } => {
                let matches_any = variants.iter().any(|v| {
                    let mut sub_issues = Vec::new();
                    v.validate(field_name, value, &mut sub_issues);
                    sub_issues.is_empty()
                });
                if !matches_any {
                    issues.push(SchemaIssue {
                        path: vec![field_name.to_string()],
                        code: "invalid_union".to_string(),
                        message: format!("'{field_name}' matched no union variant"),
                    });
                }
            }
        }
    }

    pub fn to_json_schema(&self) -> JsonValue {
        let mut node = match &self.kind {
            FieldKind::String => serde_json::json!({ "type": "string" }),
            FieldKind::Number => serde_json::json!({ "type": "number" }),
            FieldKind::Boolean => serde_json::json!({ "type": "boolean" }),
            FieldKind::Enum { options } => serde_json::json!({ "type": "string", "enum": options }),
            FieldKind::Array { item } => {
                serde_json::json!({ "type": "array", "items": item.to_json_schema() })
            }
            FieldKind::Object { schema } => schema.to_json_schema_value(),
            FieldKind::Union { variants } => {
                let alts: Vec<JsonValue> = variants.iter().map(|v| v.to_json_schema()).collect();
                serde_json::json!({ "anyOf": alts })
            }
        };
        if let Some(obj) = node.as_object_mut() {
            if let Some(desc) = &self.description {
                obj.insert("description".to_string(), JsonValue::String(desc.clone()));
            }
            if let Some(default) = &self.default {
                obj.insert("default".to_string(), default.clone());
            }
            if self.nullable {
                if let Some(t) = obj.get("type").cloned() {
                    obj.insert("type".to_string(), serde_json::json!([t, "null"]));
                }
            }
        }
        node
    }
}

/// Ordered object schema: declaration order is preserved because
/// generated-form field ordering is defined in terms of schema
/// declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    fields_ordered: Vec<(String, FieldNode)>,
    /// Declared section ordering: field names grouped by section, in the
    /// order sections and fields should appear in a generated form (the
    /// ordering rule (a)).
    #[serde(default)]
    pub section_order: Vec<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, node: FieldNode) -> Self {
        self.fields_ordered.push((name.into(), node));
        self
    }

    pub fn with_section_order(mut self, order: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.section_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldNode> {
        self.fields_ordered.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldNode)> {
        self.fields_ordered.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields_ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields_ordered.is_empty()
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.iter().filter(|(_, f)| f.is_required()).map(|(n, _)| n).collect()
    }

    /// Field declaration order, honoring `section_order` first (the
    /// ordering rule): fields named in the section ordering come first, in
    /// that order, then the remaining fields in schema declaration order,
    /// with no duplicates.
    pub fn ordered_field_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for name in &self.section_order {
            if self.get(name).is_some() && seen.insert(name.clone()) {
                out.push(name.as_str());
            }
        }
        for (name, _) in &self.fields_ordered {
            if seen.insert(name.clone()) {
                out.push(name.as_str());
            }
        }
        out
    }

    pub fn safe_parse(&self, input: &JsonValue) -> ParseOutcome {
        let Some(obj) = input.as_object() else {
            return ParseOutcome::Err(vec![SchemaIssue {
                path: vec![],
                code: "invalid_type".to_string(),
                message: "expected an object".to_string(),
            }]);
        };
        let mut issues = Vec::new();
        for (name, node) in self.iter() {
            match obj.get(name) {
                Some(value) => node.validate(name, value, &mut issues),
                None => {
                    if node.is_required() {
                        issues.push(SchemaIssue::required(name));
                    }
                }
            }
        }
        if issues.is_empty() {
            ParseOutcome::Ok(input.clone())
        } else {
            ParseOutcome::Err(issues)
        }
    }

    /// Project this schema to draft-7 JSON Schema, built by hand to match
    /// the dynamic shape of [`ObjectSchema`] — a runtime value, not a
    /// statically-known Rust type a derive macro could reflect over.
    pub fn to_json_schema(&self) -> JsonValue {
        self.to_json_schema_filtered(None)
    }

    /// Same as [`Self::to_json_schema`], but filtered to a field subset —
    /// used when `missingFields` narrows the projection.
    pub fn to_json_schema_filtered(&self, only: Option<&[String]>) -> JsonValue {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for (name, node) in self.iter() {
            if let Some(only) = only {
                if !only.iter().any(|n| n == name) {
                    continue;
                }
            }
            properties.insert(name.to_string(), node.to_json_schema());
            if node.is_required() {
                required.push(JsonValue::String(name.to_string()));
            }
        }
        serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn to_json_schema_value(&self) -> JsonValue {
        self.to_json_schema()
    }

    /// UI-schema companion: collapses metadata-bag fields, marks required
    /// fields with a help annotation, and collapses advanced/expert fields
    /// (the ui-schema projection rules).
    pub fn to_ui_schema(&self, priorities: &BTreeMap<String, String>) -> JsonValue {
        let mut ui = serde_json::Map::new();
        for (name, node) in self.iter() {
            let mut entry = serde_json::Map::new();
            if matches!(name, "attributes" | "metadata" | "properties") {
                entry.insert("ui:options".to_string(), serde_json::json!({ "collapsed": true }));
            }
            if node.is_required() {
                entry.insert("ui:help".to_string(), JsonValue::String("Required field".to_string()));
            }
            if let Some(priority) = priorities.get(name) {
                if priority == "advanced" || priority == "expert" {
                    entry
                        .entry("ui:options")
                        .or_insert_with(|| serde_json::json!({}))
                        .as_object_mut()
                        .unwrap()
                        .insert("collapsed".to_string(), JsonValue::Bool(true));
                }
            }
            if !entry.is_empty() {
                ui.insert(name.to_string(), JsonValue::Object(entry));
            }
        }
        JsonValue::Object(ui)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nft_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field("tokenName", FieldNode::string())
            .field("tokenSymbol", FieldNode::string())
            .field("maxSupply", FieldNode::number())
    }

    #[test]
    fn required_fields_match_optional_default_nullable_rule() {
        let schema = ObjectSchema::new()
            .field("a", FieldNode::string())
            .field("b", FieldNode::string().optional())
            .field("c", FieldNode::string().with_default(serde_json::json!("x")))
            .field("d", FieldNode::string().nullable());
        assert_eq!(schema.required_fields(), vec!["a"]);
    }

    #[test]
    fn safe_parse_reports_missing_required_fields() {
        let schema = nft_schema();
        let outcome = schema.safe_parse(&serde_json::json!({}));
        assert!(!outcome.is_ok());
        assert_eq!(outcome.issues().len(), 3);
    }

    #[test]
    fn safe_parse_accepts_complete_input() {
        let schema = nft_schema();
        let outcome = schema.safe_parse(&serde_json::json!({
            "tokenName": "Test", "tokenSymbol": "TT", "maxSupply": 100
        }));
        assert!(outcome.is_ok());
    }

    #[test]
    fn ordered_field_names_honors_section_order_then_declaration_order() {
        let schema = ObjectSchema::new()
            .field("a", FieldNode::string())
            .field("b", FieldNode::string())
            .field("c", FieldNode::string())
            .with_section_order(["c", "a"]);
        assert_eq!(schema.ordered_field_names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn json_schema_projection_lists_required_and_properties() {
        let schema = nft_schema();
        let json = schema.to_json_schema();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn filtered_projection_only_includes_named_fields() {
        let schema = nft_schema();
        let json = schema.to_json_schema_filtered(Some(&["tokenName".to_string()]));
        assert_eq!(json["properties"].as_object().unwrap().len(), 1);
    }
}
