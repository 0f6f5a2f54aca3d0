//! C5 — Field Type Registry: a priority-ordered, pattern-driven resolver
//! that guesses a form field's UI type from its name alone, for fields the
//! schema itself gives no stronger signal about.
//!
//! Modeled as a constructed registry value per the Design Note in DESIGN.md
//! rather than a forced global singleton; [`default_field_type_registry`]
//! gives convenience call sites a process-wide instance without making
//! that the only way to get one.

use regex::Regex;
use std::sync::OnceLock;

/// `{text,number,select,checkbox,textarea,file,array,object,currency,percentage}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Checkbox,
    Textarea,
    File,
    Array,
    Object,
    Currency,
    Percentage,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Textarea => "textarea",
            FieldType::File => "file",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Currency => "currency",
            FieldType::Percentage => "percentage",
        }
    }
}

enum Matcher {
    Exact(Vec<String>),
    Regex(Regex),
}

impl Matcher {
    fn matches(&self, field_name: &str) -> bool {
        let lower = field_name.to_lowercase();
        match self {
            Matcher::Exact(needles) => needles.iter().any(|n| lower.contains(n.as_str())),
            Matcher::Regex(re) => re.is_match(field_name),
        }
    }
}

struct Pattern {
    name: String,
    matcher: Matcher,
    field_type: FieldType,
    priority: i32,
}

/// A pattern-driven resolver mapping field names to a [`FieldType`]. Not
/// itself thread-safe by design — callers that share one across tasks wrap
/// it the way any other mutable registry is shared (a `Mutex`/`RwLock`),
/// matching the "mutations are not atomic with in-flight resolutions"
/// concurrency note above.
pub struct FieldTypeRegistry {
    patterns: Vec<Pattern>,
}

impl FieldTypeRegistry {
    /// An empty registry with none of the built-in defaults.
    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    /// The registry pre-populated with the default patterns:
    /// numeric (supply/amount/time/limit), currency, percentage, boolean
    /// (freeze/flags), textarea (memo/description), arrays, objects,
    /// select (type/kind/status). Priority range 5-15.
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register("currency", Matcher::Exact(vec!["price".into(), "cost".into(), "currency".into(), "fee".into()]), FieldType::Currency, 15);
        reg.register("percentage", Matcher::Exact(vec!["percent".into(), "rate".into(), "ratio".into()]), FieldType::Percentage, 15);
        reg.register("numeric", Matcher::Exact(vec!["supply".into(), "amount".into(), "time".into(), "limit".into(), "count".into(), "quantity".into()]), FieldType::Number, 10);
        reg.register("boolean", Matcher::Exact(vec!["freeze".into(), "flags".into(), "enabled".into(), "active".into(), "is".into()]), FieldType::Checkbox, 10);
        reg.register("textarea", Matcher::Exact(vec!["memo".into(), "description".into(), "notes".into(), "comment".into()]), FieldType::Textarea, 8);
        reg.register("select", Matcher::Exact(vec!["type".into(), "kind".into(), "status".into()]), FieldType::Select, 5);
        reg
    }

    fn register(&mut self, name: &str, matcher: Matcher, field_type: FieldType, priority: i32) {
        self.patterns.push(Pattern {
            name: name.to_string(),
            matcher,
            field_type,
            priority,
        });
    }

    /// Registers a pattern matching a fixed list of substrings (case
    /// insensitive).
    pub fn register_exact(&mut self, name: &str, needles: Vec<String>, field_type: FieldType, priority: i32) {
        self.register(name, Matcher::Exact(needles), field_type, priority);
    }

    /// Registers a pattern matching a compiled regex against the raw field
    /// name.
    pub fn register_regex(&mut self, name: &str, pattern: Regex, field_type: FieldType, priority: i32) {
        self.register(name, Matcher::Regex(pattern), field_type, priority);
    }

    pub fn unregister(&mut self, name: &str) {
        self.patterns.retain(|p| p.name != name);
    }

    /// Drops back to [`Self::with_defaults`].
    pub fn reset(&mut self) {
        *self = Self::with_defaults();
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    /// Highest-priority matching type; ties are broken by registration
    /// order (first encountered wins).
    pub fn detect_type(&self, field_name: &str) -> Option<FieldType> {
        let mut best: Option<&Pattern> = None;
        for p in &self.patterns {
            if !p.matcher.matches(field_name) {
                continue;
            }
            if best.map_or(true, |b| p.priority > b.priority) {
                best = Some(p);
            }
        }
        best.map(|p| p.field_type)
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static DEFAULT_REGISTRY: OnceLock<std::sync::RwLock<FieldTypeRegistry>> = OnceLock::new();

/// Process-wide convenience instance. Most call sites should prefer
/// constructing their own [`FieldTypeRegistry`] (tests especially — a
/// shared global makes test isolation harder); this exists for embedders
/// that genuinely want one registry for the whole process.
pub fn default_field_type_registry() -> &'static std::sync::RwLock<FieldTypeRegistry> {
    DEFAULT_REGISTRY.get_or_init(|| std::sync::RwLock::new(FieldTypeRegistry::with_defaults()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_numeric_fields_by_name() {
        let reg = FieldTypeRegistry::with_defaults();
        assert_eq!(reg.detect_type("maxSupply"), Some(FieldType::Number));
        assert_eq!(reg.detect_type("tokenAmount"), Some(FieldType::Number));
    }

    #[test]
    fn detects_currency_and_percentage_before_generic_numeric() {
        let reg = FieldTypeRegistry::with_defaults();
        assert_eq!(reg.detect_type("listingPrice"), Some(FieldType::Currency));
        assert_eq!(reg.detect_type("taxRate"), Some(FieldType::Percentage));
    }

    #[test]
    fn detects_textarea_and_select_fields() {
        let reg = FieldTypeRegistry::with_defaults();
        assert_eq!(reg.detect_type("memo"), Some(FieldType::Textarea));
        assert_eq!(reg.detect_type("accountType"), Some(FieldType::Select));
    }

    #[test]
    fn unknown_field_name_detects_nothing() {
        let reg = FieldTypeRegistry::with_defaults();
        assert_eq!(reg.detect_type("foobarbaz"), None);
    }

    #[test]
    fn register_and_unregister_custom_pattern() {
        let mut reg = FieldTypeRegistry::empty();
        reg.register_exact("custom", vec!["widget".into()], FieldType::File, 20);
        assert_eq!(reg.detect_type("widgetUpload"), Some(FieldType::File));
        reg.unregister("custom");
        assert_eq!(reg.detect_type("widgetUpload"), None);
    }

    #[test]
    fn clear_removes_all_patterns_reset_restores_defaults() {
        let mut reg = FieldTypeRegistry::with_defaults();
        reg.clear();
        assert_eq!(reg.detect_type("maxSupply"), None);
        reg.reset();
        assert_eq!(reg.detect_type("maxSupply"), Some(FieldType::Number));
    }
}
