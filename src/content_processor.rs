//! C10 — MCP Content Processor & Response Formatter: rewrites oversized
//! tool-response content items into content references, and renders the
//! fixed human-readable templates for structurally-recognized tool
//! payloads (inscription / interactive-content responses).

use crate::memory::reference_store::{ContentReferenceStore, ContentSource, StoreOptions};
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::sync::OnceLock;

static REFERENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// `ref://<43-char-url-safe>` or a standalone 43-char word.
fn reference_pattern() -> &'static Regex {
    REFERENCE_PATTERN.get_or_init(|| {
        Regex::new(r"ref://([A-Za-z0-9_-]{43})|(?:^|\s)([A-Za-z0-9_-]{43})(?:\s|$)").unwrap()
    })
}

/// `{ type:"content_reference", referenceId, preview, size, contentType,
/// format, _isReference:true }` embedded in place of an oversized content
/// item.
fn content_reference_marker(reference: &crate::memory::reference_store::ContentReference) -> JsonValue {
    serde_json::json!({
        "type": "content_reference",
        "referenceId": reference.reference_id,
        "preview": reference.preview,
        "size": reference.metadata.size_bytes,
        "contentType": reference.metadata.content_type,
        "format": reference.format,
        "_isReference": true,
    })
}

fn extract_bytes(item: &Map<String, JsonValue>, kind: &str) -> Option<Vec<u8>> {
    match kind {
        "text" => item.get("text").and_then(|v| v.as_str()).map(|s| s.as_bytes().to_vec()),
        "image" => item.get("data").and_then(|v| v.as_str()).map(|s| s.as_bytes().to_vec()),
        "resource" => item.get("resource").and_then(|resource| {
            resource
                .get("text")
                .or_else(|| resource.get("blob"))
                .and_then(|v| v.as_str())
                .map(|s| s.as_bytes().to_vec())
        }),
        _ => None,
    }
}

fn rewrite_value<'a>(
    store: &'a ContentReferenceStore,
    value: &'a mut JsonValue,
    server_name: &'a str,
    tool_name: &'a str,
    errors: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        match value {
            JsonValue::Array(items) => {
                for item in items.iter_mut() {
                    rewrite_value(store, item, server_name, tool_name, errors).await;
                }
            }
            JsonValue::Object(map) => {
                let kind = map.get("type").and_then(|v| v.as_str()).map(|s| s.to_string());
                if let Some(kind) = kind {
                    if matches!(kind.as_str(), "text" | "image" | "resource") {
                        match extract_bytes(map, &kind) {
                            Some(bytes) => {
                                let opts = StoreOptions {
                                    source: Some(ContentSource::McpTool),
                                    tags: vec![
                                        "mcp_response".to_string(),
                                        server_name.to_string(),
                                        tool_name.to_string(),
                                    ],
                                    ..Default::default()
                                };
                                if let Some(reference) = store.store_content_if_large(&bytes, opts).await {
                                    *value = content_reference_marker(&reference);
                                }
                            }
                            None => {
                                errors.push(format!("could not extract content from a '{kind}' item"));
                            }
                        }
                        return;
                    }
                }
                for (_, v) in map.iter_mut() {
                    rewrite_value(store, v, server_name, tool_name, errors).await;
                }
            }
            _ => {}
        }
    })
}

/// Recursively scans `response` for oversized `text`/`image`/`resource`
/// content items and replaces them with reference markers. Operates on a
/// deep clone; the caller's original value is untouched. Failure to store
/// any one item is appended to the returned error list rather than
/// aborting the rest of the scan.
pub async fn process_tool_response(
    store: &ContentReferenceStore,
    response: &JsonValue,
    server_name: &str,
    tool_name: &str,
) -> (JsonValue, Vec<String>) {
    let mut cloned = response.clone();
    let mut errors = Vec::new();
    rewrite_value(store, &mut cloned, server_name, tool_name, &mut errors).await;
    (cloned, errors)
}

/// `extractReferenceId(text) -> id | null`: the first `ref://`-prefixed or
/// standalone 43-char reference id found in `text`.
pub fn extract_reference_id(text: &str) -> Option<String> {
    reference_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
}

/// `shouldUseReference(bytes) -> bool`: the Standards SDK heuristic using
/// a fixed default threshold, independent of any particular store's
/// configured threshold.
pub fn should_use_reference(content: &[u8]) -> bool {
    const DEFAULT_THRESHOLD_BYTES: usize = 4096;
    content.len() > DEFAULT_THRESHOLD_BYTES
}

/// Resolves every reference id found in `text` back to a rendered form:
/// successful resolutions splice in the stored preview, failures degrade
/// to a compact marker plus a recovery hint rather than aborting.
pub async fn resolve_references_in_text(store: &ContentReferenceStore, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for caps in reference_pattern().captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let id = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        out.push_str(&text[last_end..whole.start()]);
        match store.resolve_reference(id).await {
            Ok((_, metadata)) => {
                out.push_str(&format!("[{} content, {} bytes]", format!("{:?}", metadata.content_type).to_lowercase(), metadata.size_bytes));
            }
            Err(err) if err.error_type == crate::memory::reference_store::ErrorType::NotFound => {
                let prefix: String = id.chars().take(8).collect();
                out.push_str(&format!("❌ Reference unavailable: {prefix}..."));
            }
            Err(err) => {
                let hint = err.suggested_actions.first().cloned().unwrap_or_default();
                out.push_str(&format!("⚠️ Reference error: {} ({hint})", err.message));
            }
        }
        last_end = whole.end();
    }
    out.push_str(&text[last_end..]);
    out
}

fn field_from<'a>(inscription: Option<&'a Map<String, JsonValue>>, block: Option<&'a Map<String, JsonValue>>, key: &str) -> Option<&'a str> {
    inscription
        .and_then(|i| i.get(key))
        .and_then(|v| v.as_str())
        .or_else(|| block.and_then(|b| b.get(key)).and_then(|v| v.as_str()))
}

fn render_inscription_template(obj: &Map<String, JsonValue>, caller_title: Option<&str>) -> String {
    let inscription = obj.get("inscription").and_then(|v| v.as_object());
    let hash_link_block = obj
        .get("hashLinkBlock")
        .and_then(|v| v.as_object())
        .and_then(|b| b.get("attributes").and_then(|a| a.as_object()).or(Some(b)));

    let title = caller_title
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            if inscription.is_some() {
                "Inscription Complete".to_string()
            } else {
                "Interactive content created successfully!".to_string()
            }
        });

    let mut lines = vec![format!("✅ {title}")];
    if let Some(name) = field_from(inscription, hash_link_block, "name") {
        lines.push(String::new());
        lines.push(format!("**{name}**"));
    }
    if let Some(description) = field_from(inscription, hash_link_block, "description") {
        lines.push(description.to_string());
    }
    if let Some(topic_id) = field_from(inscription, hash_link_block, "topicId") {
        lines.push(format!("Topic ID: {topic_id}"));
    }
    if let Some(hrl) = field_from(inscription, hash_link_block, "hrl") {
        lines.push(format!("HRL: {hrl}"));
    }
    if let Some(cdn_url) = field_from(inscription, hash_link_block, "cdnUrl") {
        lines.push(format!("CDN URL: {cdn_url}"));
    }
    if let Some(creator) = field_from(inscription, hash_link_block, "creator") {
        lines.push(format!("Creator: {creator}"));
    }
    lines.join("\n")
}

fn is_inscription_shape(obj: &Map<String, JsonValue>) -> bool {
    let success = obj.get("success").and_then(|v| v.as_bool()) == Some(true);
    let is_inscription_type = obj.get("type").and_then(|v| v.as_str()) == Some("inscription");
    let has_payload = obj.contains_key("hashLinkBlock") || obj.contains_key("inscription");
    success && is_inscription_type && has_payload
}

/// `formatResponse(str)`: attempts to parse `str` as JSON; on success,
/// renders the fixed human-readable template when the parsed value
/// matches the inscription/interactive-content shape, otherwise returns
/// the original string. Malformed JSON degrades to passthrough silently.
pub fn format_response(raw: &str) -> String {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(obj)) if is_inscription_shape(&obj) => render_inscription_template(&obj, None),
        _ => raw.to_string(),
    }
}

/// Same as [`format_response`], with a caller-supplied title overriding
/// the default "Inscription Complete" / "Interactive content created
/// successfully!" status line.
pub fn format_response_with_title(raw: &str, title: &str) -> String {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(obj)) if is_inscription_shape(&obj) => render_inscription_template(&obj, Some(title)),
        _ => raw.to_string(),
    }
}

/// `hashLinkBlock` metadata carried on a tool response, propagated into
/// the executor step's own metadata.
pub fn extract_hash_link_block(raw: &str) -> Option<JsonValue> {
    let parsed: JsonValue = serde_json::from_str(raw).ok()?;
    parsed.get("hashLinkBlock").cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceStoreConfig;

    fn small_store() -> ContentReferenceStore {
        ContentReferenceStore::new(ReferenceStoreConfig {
            size_threshold_bytes: 10,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn replaces_oversized_text_items_with_reference_markers() {
        let store = small_store();
        let response = serde_json::json!({
            "content": [
                { "type": "text", "text": "short" },
                { "type": "text", "text": "this text is definitely over the size threshold" },
            ]
        });
        let (rewritten, errors) = process_tool_response(&store, &response, "weather-server", "GetForecast").await;
        assert!(errors.is_empty());
        let items = rewritten["content"].as_array().unwrap();
        assert_eq!(items[0]["type"], "text");
        assert_eq!(items[1]["type"], "content_reference");
        assert_eq!(items[1]["_isReference"], true);
    }

    #[tokio::test]
    async fn malformed_content_item_is_collected_as_an_error_not_aborted() {
        let store = small_store();
        let response = serde_json::json!({
            "content": [
                { "type": "text" },
                { "type": "text", "text": "short" },
            ]
        });
        let (rewritten, errors) = process_tool_response(&store, &response, "s", "t").await;
        assert_eq!(errors.len(), 1);
        assert_eq!(rewritten["content"][1]["text"], "short");
    }

    #[test]
    fn format_response_passes_through_invalid_json_unchanged() {
        assert_eq!(format_response("{invalid"), "{invalid");
    }

    #[test]
    fn format_response_renders_inscription_template() {
        let raw = serde_json::json!({
            "success": true,
            "type": "inscription",
            "inscription": { "topicId": "0.0.123" }
        })
        .to_string();
        let rendered = format_response(&raw);
        assert!(rendered.starts_with("✅ Inscription Complete"));
        assert!(rendered.contains("0.0.123"));
    }

    #[test]
    fn format_response_prefers_inscription_values_over_block_attributes() {
        let raw = serde_json::json!({
            "success": true,
            "type": "inscription",
            "hashLinkBlock": { "attributes": { "topicId": "0.0.999", "creator": "block" } },
            "inscription": { "topicId": "0.0.123", "creator": "inscription" }
        })
        .to_string();
        let rendered = format_response(&raw);
        assert!(rendered.contains("Topic ID: 0.0.123"));
        assert!(rendered.contains("Creator: inscription"));
    }

    #[test]
    fn extract_reference_id_matches_uri_and_bare_forms() {
        let id = "a".repeat(43);
        assert_eq!(extract_reference_id(&format!("see ref://{id} for details")), Some(id.clone()));
        assert_eq!(extract_reference_id(&format!("bare {id} here")), Some(id));
        assert_eq!(extract_reference_id("nothing here"), None);
    }
}
