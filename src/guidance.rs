//! C6 — Field Guidance Registry: static per-tool configuration merged with
//! dynamic providers to produce field-level suggestions, help text,
//! validation rules, and type overrides.

use crate::config::{guidance_enabled};
use crate::field_types::FieldType;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// `pattern (exact/substring/regex)` from a guidance provider registration
/// or a static tool configuration. Matching rules: a string pattern is
/// a case-insensitive substring of `toolName`; a regex pattern is tested
/// directly. `Exact` is a stricter substring variant for callers that want
/// whole-name matching rather than substring matching.
pub enum ToolPattern {
    Exact(String),
    Substring(String),
    Regex(Regex),
}

impl ToolPattern {
    fn matches(&self, tool_name: &str) -> bool {
        match self {
            ToolPattern::Exact(s) => s.eq_ignore_ascii_case(tool_name),
            ToolPattern::Substring(s) => tool_name.to_lowercase().contains(&s.to_lowercase()),
            ToolPattern::Regex(re) => re.is_match(tool_name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualityChecks {
    pub forbid_technical_terms: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub reject_patterns: Vec<String>,
    /// `(substring, warning message)` pairs checked against string values.
    pub warning_patterns: Vec<(String, String)>,
    pub quality_checks: Option<QualityChecks>,
    pub require_specific_terms: Option<Vec<String>>,
    pub min_non_technical_words: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldGuidance {
    pub suggestions: Option<Vec<String>>,
    pub predefined_options: Option<Vec<String>>,
    pub warnings: Vec<String>,
    pub validation_rules: Option<ValidationRules>,
    pub field_type_override: Option<FieldType>,
    pub contextual_help_text: Option<String>,
}

impl FieldGuidance {
    /// Per-key override where a field left `None`/empty on `overlay`
    /// preserves the value already present on `self`.
    fn merged_with(self, overlay: FieldGuidance) -> FieldGuidance {
        FieldGuidance {
            suggestions: overlay.suggestions.or(self.suggestions),
            predefined_options: overlay.predefined_options.or(self.predefined_options),
            warnings: if overlay.warnings.is_empty() { self.warnings } else { overlay.warnings },
            validation_rules: overlay.validation_rules.or(self.validation_rules),
            field_type_override: overlay.field_type_override.or(self.field_type_override),
            contextual_help_text: overlay.contextual_help_text.or(self.contextual_help_text),
        }
    }

    fn is_empty(&self) -> bool {
        self.suggestions.is_none()
            && self.predefined_options.is_none()
            && self.warnings.is_empty()
            && self.validation_rules.is_none()
            && self.field_type_override.is_none()
            && self.contextual_help_text.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlobalGuidance {
    pub warnings: Vec<String>,
    pub quality_standards: Vec<String>,
}

impl GlobalGuidance {
    fn merged_with(mut self, overlay: GlobalGuidance) -> GlobalGuidance {
        self.warnings.extend(overlay.warnings);
        self.quality_standards.extend(overlay.quality_standards);
        self
    }

    fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.quality_standards.is_empty()
    }
}

pub struct ToolConfiguration {
    pub tool_pattern: ToolPattern,
    pub fields: HashMap<String, FieldGuidance>,
    pub global_guidance: Option<GlobalGuidance>,
}

/// A dynamic field-guidance source. Implementations are called on every
/// matching resolution; a panicking/misbehaving provider must not
/// take down the resolution it's part of, so callers are isolated via
/// `catch_unwind` at the call site in [`FieldGuidanceRegistry`].
pub trait GuidanceProvider: Send + Sync {
    fn field_guidance(&self, _tool_name: &str, _field_name: &str) -> Option<FieldGuidance> {
        None
    }

    fn global_guidance(&self, _tool_name: &str) -> Option<GlobalGuidance> {
        None
    }
}

struct ProviderRegistration {
    id: String,
    priority: i32,
    pattern: ToolPattern,
    provider: Arc<dyn GuidanceProvider>,
    registration_order: u64,
}

#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub id: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Default)]
pub struct FieldValidation {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("duplicate provider id: {0}")]
pub struct DuplicateProviderId(pub String);

/// Static tool configurations plus dynamic provider registrations, merged
/// per tool/field on lookup. See the module doc comment for the resolution algorithm this
/// implements.
pub struct FieldGuidanceRegistry {
    tool_configs: Vec<ToolConfiguration>,
    providers: Vec<ProviderRegistration>,
    next_registration_order: u64,
}

impl FieldGuidanceRegistry {
    pub fn new() -> Self {
        Self {
            tool_configs: Vec::new(),
            providers: Vec::new(),
            next_registration_order: 0,
        }
    }

    pub fn register_tool_configuration(&mut self, config: ToolConfiguration) {
        self.tool_configs.push(config);
    }

    /// Registers a dynamic provider. `id` defaults to a random uuid when
    /// not supplied. Returns the id used, or an error if it collides with
    /// an already-registered provider.
    pub fn register_tool_provider(
        &mut self,
        pattern: ToolPattern,
        provider: Arc<dyn GuidanceProvider>,
        id: Option<String>,
        priority: i32,
    ) -> Result<String, DuplicateProviderId> {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.providers.iter().any(|p| p.id == id) {
            return Err(DuplicateProviderId(id));
        }
        let registration_order = self.next_registration_order;
        self.next_registration_order += 1;
        self.providers.push(ProviderRegistration {
            id: id.clone(),
            priority,
            pattern,
            provider,
            registration_order,
        });
        Ok(id)
    }

    pub fn unregister_provider(&mut self, id: &str) {
        self.providers.retain(|p| p.id != id);
    }

    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|p| ProviderInfo {
                id: p.id.clone(),
                priority: p.priority,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.tool_configs.clear();
        self.providers.clear();
    }

    fn matching_providers(&self, tool_name: &str) -> Vec<&ProviderRegistration> {
        let mut matched: Vec<&ProviderRegistration> = self
            .providers
            .iter()
            .filter(|p| p.pattern.matches(tool_name))
            .collect();
        // Ascending so the fold below applies higher-priority (then
        // later-registered) providers last, letting them override.
        matched.sort_by_key(|p| (p.priority, p.registration_order));
        matched
    }

    fn static_field_guidance(&self, tool_name: &str, field_name: &str) -> FieldGuidance {
        let mut base = FieldGuidance::default();
        for config in &self.tool_configs {
            if !config.tool_pattern.matches(tool_name) {
                continue;
            }
            if let Some(field) = config.fields.get(field_name) {
                base = base.merged_with(field.clone());
            }
        }
        base
    }

    fn static_global_guidance(&self, tool_name: &str) -> GlobalGuidance {
        let mut base = GlobalGuidance::default();
        for config in &self.tool_configs {
            if !config.tool_pattern.matches(tool_name) {
                continue;
            }
            if let Some(global) = &config.global_guidance {
                base = base.merged_with(global.clone());
            }
        }
        base
    }

    /// `getFieldGuidance(toolName, fieldName)`. Returns `None` when
    /// `CA_FORM_GUIDANCE_ENABLED="false"` (static configurations stay
    /// registered; only the lookup goes dark).
    pub fn get_field_guidance(&self, tool_name: &str, field_name: &str) -> Option<FieldGuidance> {
        if !guidance_enabled() {
            return None;
        }
        let mut result = self.static_field_guidance(tool_name, field_name);
        for reg in self.matching_providers(tool_name) {
            let provider = Arc::clone(&reg.provider);
            let tool_name_owned = tool_name.to_string();
            let field_name_owned = field_name.to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                provider.field_guidance(&tool_name_owned, &field_name_owned)
            }));
            match outcome {
                Ok(Some(overlay)) => result = result.merged_with(overlay),
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(
                        provider_id = %reg.id,
                        tool = tool_name,
                        field = field_name,
                        "guidance provider panicked; treating as no guidance"
                    );
                }
            }
        }
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// `getGlobalGuidance(toolName)`. Same gating and merge shape as
    /// [`Self::get_field_guidance`], restricted to `warnings`/
    /// `qualityStandards`.
    pub fn get_global_guidance(&self, tool_name: &str) -> Option<GlobalGuidance> {
        if !guidance_enabled() {
            return None;
        }
        let mut result = self.static_global_guidance(tool_name);
        for reg in self.matching_providers(tool_name) {
            let provider = Arc::clone(&reg.provider);
            let tool_name_owned = tool_name.to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| provider.global_guidance(&tool_name_owned)));
            match outcome {
                Ok(Some(overlay)) => result = result.merged_with(overlay),
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(provider_id = %reg.id, tool = tool_name, "guidance provider panicked on global guidance");
                }
            }
        }
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Validates a field value against its merged validation rules.
    /// Non-string values always pass.
    pub fn validate_field_value(&self, tool_name: &str, field_name: &str, value: &JsonValue) -> FieldValidation {
        let Some(s) = value.as_str() else {
            return FieldValidation {
                is_valid: true,
                ..Default::default()
            };
        };
        let lower = s.to_lowercase();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(guidance) = self.get_field_guidance(tool_name, field_name) {
            warnings.extend(guidance.warnings.clone());
            if let Some(rules) = &guidance.validation_rules {
                for (pattern, message) in &rules.warning_patterns {
                    if lower.contains(&pattern.to_lowercase()) {
                        warnings.push(message.clone());
                    }
                }
                for pattern in &rules.reject_patterns {
                    if lower.contains(&pattern.to_lowercase()) {
                        errors.push(format!("value matches rejected pattern '{pattern}'"));
                    }
                }
                if let Some(checks) = &rules.quality_checks {
                    for term in &checks.forbid_technical_terms {
                        if lower.contains(&term.to_lowercase()) {
                            errors.push(format!("value contains forbidden technical term '{term}'"));
                        }
                    }
                }
                if let Some(required) = &rules.require_specific_terms {
                    if !required.is_empty() && !required.iter().any(|t| lower.contains(&t.to_lowercase())) {
                        warnings.push(format!(
                            "value does not mention any of the expected terms: {}",
                            required.join(", ")
                        ));
                    }
                }
                if let Some(min_words) = rules.min_non_technical_words {
                    let word_count = s.split_whitespace().count();
                    if word_count < min_words {
                        warnings.push(format!(
                            "value has {word_count} word(s), expected at least {min_words}"
                        ));
                    }
                }
            }
        }

        FieldValidation {
            is_valid: errors.is_empty(),
            warnings,
            errors,
        }
    }
}

impl Default for FieldGuidanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
