//! C3 — Content Reference Store: a content-addressed store that swaps
//! large payloads for opaque references, with TTL/size/count eviction
//!.

use crate::config::{ReferenceStoreConfig, SourcePolicy};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Json,
    Html,
    Markdown,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    McpTool,
    UserUpload,
    AgentGenerated,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceState {
    Active,
    Expired,
    CleanupPending,
    Corrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    NotFound,
    Expired,
    Corrupted,
    SystemError,
}

#[derive(Debug, Clone)]
pub struct ResolveError {
    pub error_type: ErrorType,
    pub message: String,
    pub suggested_actions: Vec<String>,
}

impl ResolveError {
    fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            suggested_actions: suggested_actions_for(error_type),
        }
    }
}

fn suggested_actions_for(error_type: ErrorType) -> Vec<String> {
    match error_type {
        ErrorType::NotFound => vec![
            "Verify the reference ID".to_string(),
            "Request fresh content".to_string(),
        ],
        ErrorType::Expired => vec![
            "Request fresh content".to_string(),
            "Increase the content's TTL at store time".to_string(),
        ],
        ErrorType::Corrupted => vec![
            "Request fresh content".to_string(),
            "Report this reference ID for investigation".to_string(),
        ],
        ErrorType::SystemError => vec![
            "Retry the request".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    pub content_type: ContentType,
    pub size_bytes: usize,
    pub source: ContentSource,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub created_at: u64,
    pub last_accessed_at: u64,
    pub access_count: u64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContentReference {
    pub reference_id: String,
    pub state: ReferenceState,
    pub preview: String,
    pub metadata: ReferenceMetadata,
    pub created_at: u64,
    pub expires_at: Option<u64>,
    pub format: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub content_type: Option<ContentType>,
    pub source: Option<ContentSource>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub tags: Vec<String>,
    /// `None` uses the store's `default_ttl_ms`; `Some(None)` via
    /// [`StoreOptions::no_expiry`] stores without an expiry.
    pub ttl_ms: Option<Option<u64>>,
}

impl StoreOptions {
    pub fn with_source(source: ContentSource) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn no_expiry(mut self) -> Self {
        self.ttl_ms = Some(None);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub active_references: usize,
    pub total_storage_bytes: u64,
    pub total_resolutions: u64,
    pub failed_resolutions: u64,
    pub recently_cleaned_up: u64,
    pub average_content_size: f64,
    pub storage_utilization: f64,
    pub most_accessed_reference_id: Option<String>,
    pub avg_creation_duration_micros: f64,
    pub avg_resolution_duration_micros: f64,
    pub avg_cleanup_duration_micros: f64,
}

struct StoredEntry {
    reference: ContentReference,
    bytes: Vec<u8>,
}

/// Fixed-size ring buffer backing the rolling average of the last 100
/// samples for a timing statistic.
struct RollingAverage {
    samples: VecDeque<u128>,
    capacity: usize,
}

impl RollingAverage {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: 100,
        }
    }

    fn push(&mut self, micros: u128) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(micros);
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<u128>() as f64 / self.samples.len() as f64
    }
}

struct Inner {
    config: ReferenceStoreConfig,
    entries: HashMap<String, StoredEntry>,
    total_resolutions: u64,
    failed_resolutions: u64,
    recently_cleaned_up: u64,
    creation_durations: RollingAverage,
    resolution_durations: RollingAverage,
    cleanup_durations: RollingAverage,
}

pub struct ContentReferenceStore {
    inner: Arc<Mutex<Inner>>,
    cleanup_handle: Mutex<Option<JoinHandle<()>>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Reference ids are a 43-character URL-safe encoding of a
/// collision-resistant hash of the content bytes (BLAKE3-256, base64url,
/// unpadded — 32 bytes encodes to exactly 43 characters). Content-
/// addressing guarantees equal content shares one reference.
fn compute_reference_id(content: &[u8]) -> String {
    let digest = blake3::hash(content);
    URL_SAFE_NO_PAD.encode(digest.as_bytes())
}

/// `referenceId` validity: exactly 43 chars, alphabet `[A-Za-z0-9_-]`.
pub fn is_valid_reference_id(id: &str) -> bool {
    id.chars().count() == 43
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn detect_content_type(content: &[u8], mime_type: Option<&str>) -> ContentType {
    if let Some(mime) = mime_type {
        if mime == "text/html" {
            return ContentType::Html;
        }
        if mime == "text/markdown" {
            return ContentType::Markdown;
        }
        if mime == "application/json" {
            return ContentType::Json;
        }
        if !mime.starts_with("text/") && mime != "application/json" {
            return ContentType::Binary;
        }
    }
    let Ok(text) = std::str::from_utf8(content) else {
        return ContentType::Binary;
    };
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return ContentType::Json;
    }
    if text.contains("<html>") || text.contains("<!DOCTYPE") {
        return ContentType::Html;
    }
    if let Some(first_line) = text.lines().next() {
        if first_line.trim_start().starts_with('#') && text.contains('\n') {
            return ContentType::Markdown;
        }
    }
    ContentType::Text
}

fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_preview(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

fn build_preview(content: &[u8], content_type: ContentType) -> String {
    if content.is_empty() && content_type == ContentType::Binary {
        return "[Binary content]".to_string();
    }
    match content_type {
        ContentType::Binary => "[Binary content]".to_string(),
        ContentType::Html => {
            let text = String::from_utf8_lossy(content);
            truncate_preview(&strip_html(&text), 200)
        }
        ContentType::Json => {
            let text = String::from_utf8_lossy(content);
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => truncate_preview(&value.to_string(), 200),
                Err(_) => truncate_preview(&text, 200),
            }
        }
        ContentType::Text | ContentType::Markdown => {
            let text = String::from_utf8_lossy(content);
            if text.is_empty() {
                "[Binary content]".to_string()
            } else {
                truncate_preview(&text, 200)
            }
        }
    }
}

fn policy_for<'a>(config: &'a ReferenceStoreConfig, source: ContentSource) -> &'a SourcePolicy {
    match source {
        ContentSource::McpTool => &config.recent_policy,
        ContentSource::UserUpload => &config.user_content_policy,
        ContentSource::AgentGenerated => &config.agent_generated_policy,
        ContentSource::Other => &config.default_policy,
    }
}

impl ContentReferenceStore {
    pub fn new(config: ReferenceStoreConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                config,
                entries: HashMap::new(),
                total_resolutions: 0,
                failed_resolutions: 0,
                recently_cleaned_up: 0,
                creation_durations: RollingAverage::new(),
                resolution_durations: RollingAverage::new(),
                cleanup_durations: RollingAverage::new(),
            })),
            cleanup_handle: Mutex::new(None),
        }
    }

    /// `shouldUseReference(content) <=> size(content) > sizeThresholdBytes`.
    pub async fn should_use_reference(&self, content: &[u8]) -> bool {
        let inner = self.inner.lock().await;
        content.len() > inner.config.size_threshold_bytes
    }

    /// Stores only if `content` exceeds the size threshold; returns
    /// `None` otherwise (pass-through).
    pub async fn store_content_if_large(
        &self,
        content: &[u8],
        opts: StoreOptions,
    ) -> Option<ContentReference> {
        if !self.should_use_reference(content).await {
            return None;
        }
        Some(self.store_content(content, opts).await)
    }

    /// Always stores, regardless of size.
    pub async fn store_content(&self, content: &[u8], opts: StoreOptions) -> ContentReference {
        let start = std::time::Instant::now();
        let reference_id = compute_reference_id(content);
        let content_type = opts
            .content_type
            .unwrap_or_else(|| detect_content_type(content, opts.mime_type.as_deref()));
        let source = opts.source.unwrap_or(ContentSource::Other);
        let now = now_ms();

        let mut inner = self.inner.lock().await;
        let ttl_ms = match opts.ttl_ms {
            Some(explicit) => explicit,
            None => inner.config.default_ttl_ms,
        };
        let expires_at = ttl_ms.map(|ttl| now + ttl);

        let preview = build_preview(content, content_type);
        let metadata = ReferenceMetadata {
            content_type,
            size_bytes: content.len(),
            source,
            mime_type: opts.mime_type,
            file_name: opts.file_name,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            tags: opts.tags,
        };
        let reference = ContentReference {
            reference_id: reference_id.clone(),
            state: ReferenceState::Active,
            preview,
            metadata,
            created_at: now,
            expires_at,
            format: format!("ref://{reference_id}"),
        };

        inner.entries.insert(
            reference_id.clone(),
            StoredEntry {
                reference: reference.clone(),
                bytes: content.to_vec(),
            },
        );
        inner.creation_durations.push(start.elapsed().as_micros());

        let over_budget = inner.total_storage_bytes() > inner.config.max_total_storage_bytes;
        drop(inner);
        if over_budget {
            self.perform_cleanup().await;
        }

        reference
    }

    pub async fn has_reference(&self, id: &str) -> bool {
        if !is_valid_reference_id(id) {
            return false;
        }
        let now = now_ms();
        let inner = self.inner.lock().await;
        match inner.entries.get(id) {
            Some(entry) => {
                entry.reference.state == ReferenceState::Active
                    && entry.reference.expires_at.map(|exp| now <= exp).unwrap_or(true)
            }
            None => false,
        }
    }

    pub async fn resolve_reference(
        &self,
        id: &str,
    ) -> Result<(Vec<u8>, ReferenceMetadata), ResolveError> {
        let start = std::time::Instant::now();
        if !is_valid_reference_id(id) {
            let mut inner = self.inner.lock().await;
            inner.total_resolutions += 1;
            inner.failed_resolutions += 1;
            return Err(ResolveError::new(ErrorType::NotFound, "reference id is malformed"));
        }

        let mut inner = self.inner.lock().await;
        inner.total_resolutions += 1;

        let now = now_ms();
        let result = match inner.entries.get_mut(id) {
            None => Err(ResolveError::new(ErrorType::NotFound, "reference not found")),
            Some(entry) => {
                if let Some(expires_at) = entry.reference.expires_at {
                    if now > expires_at && entry.reference.state == ReferenceState::Active {
                        entry.reference.state = ReferenceState::Expired;
                    }
                }
                match entry.reference.state {
                    ReferenceState::Active => {
                        entry.reference.metadata.last_accessed_at = now;
                        entry.reference.metadata.access_count += 1;
                        Ok((entry.bytes.clone(), entry.reference.metadata.clone()))
                    }
                    ReferenceState::Expired => {
                        Err(ResolveError::new(ErrorType::Expired, "reference has expired"))
                    }
                    ReferenceState::CleanupPending => Err(ResolveError::new(
                        ErrorType::NotFound,
                        "reference has been removed",
                    )),
                    ReferenceState::Corrupted => Err(ResolveError::new(
                        ErrorType::Corrupted,
                        "reference content failed an integrity check",
                    )),
                }
            }
        };

        if result.is_err() {
            inner.failed_resolutions += 1;
        }
        inner.resolution_durations.push(start.elapsed().as_micros());
        result
    }

    pub async fn cleanup_reference(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.entries.get_mut(id) {
            entry.reference.state = ReferenceState::CleanupPending;
        }
    }

    /// Marks a reference corrupted; future resolutions fail with
    /// `errorType: corrupted` until cleaned up. Exposed for embedders that
    /// perform their own integrity checks over stored bytes.
    pub async fn mark_corrupted(&self, id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.entries.get_mut(id) {
            entry.reference.state = ReferenceState::Corrupted;
        }
    }

    pub async fn get_stats(&self) -> StoreStats {
        let inner = self.inner.lock().await;
        let active: Vec<&StoredEntry> = inner
            .entries
            .values()
            .filter(|e| e.reference.state == ReferenceState::Active)
            .collect();
        let total_storage_bytes: u64 = active.iter().map(|e| e.bytes.len() as u64).sum();
        let average_content_size = if active.is_empty() {
            0.0
        } else {
            total_storage_bytes as f64 / active.len() as f64
        };
        let storage_utilization = if inner.config.max_total_storage_bytes == 0 {
            0.0
        } else {
            (total_storage_bytes as f64 / inner.config.max_total_storage_bytes as f64) * 100.0
        };
        let most_accessed_reference_id = active
            .iter()
            .max_by_key(|e| e.reference.metadata.access_count)
            .filter(|e| e.reference.metadata.access_count > 0)
            .map(|e| e.reference.reference_id.clone());

        StoreStats {
            active_references: active.len(),
            total_storage_bytes,
            total_resolutions: inner.total_resolutions,
            failed_resolutions: inner.failed_resolutions,
            recently_cleaned_up: inner.recently_cleaned_up,
            average_content_size,
            storage_utilization,
            most_accessed_reference_id,
            avg_creation_duration_micros: inner.creation_durations.average(),
            avg_resolution_duration_micros: inner.resolution_durations.average(),
            avg_cleanup_duration_micros: inner.cleanup_durations.average(),
        }
    }

    /// Runs one cleanup pass: (1) mark/expire by `expiresAt`, (2) age
    /// out by source policy, (3) remove explicitly-pending entries,
    /// highest-priority-first, (4) evict least-recently-accessed if
    /// still over `maxReferences`.
    pub async fn perform_cleanup(&self) {
        let start = std::time::Instant::now();
        let mut inner = self.inner.lock().await;
        let now = now_ms();
        let mut removed = 0u64;

        // (1) expire by expiresAt
        for entry in inner.entries.values_mut() {
            if entry.reference.state == ReferenceState::Active {
                if let Some(expires_at) = entry.reference.expires_at {
                    if now > expires_at {
                        entry.reference.state = ReferenceState::Expired;
                    }
                }
            }
        }

        // (2) age out by source policy, highest priority first
        let mut by_priority: Vec<(u8, String)> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.reference.state == ReferenceState::Active)
            .map(|(id, e)| {
                let policy = policy_for(&inner.config, e.reference.metadata.source);
                (policy.priority, id.clone())
            })
            .collect();
        by_priority.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, id) in by_priority {
            let entry = inner.entries.get(&id).unwrap();
            let policy = policy_for(&inner.config, entry.reference.metadata.source);
            let age = now.saturating_sub(entry.reference.created_at);
            if age > policy.max_age_ms {
                inner.entries.get_mut(&id).unwrap().reference.state = ReferenceState::Expired;
            }
        }

        // (3) remove pending/expired entries entirely
        let to_remove: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| {
                matches!(
                    e.reference.state,
                    ReferenceState::CleanupPending | ReferenceState::Expired | ReferenceState::Corrupted
                )
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in to_remove {
            inner.entries.remove(&id);
            removed += 1;
        }

        // (4) evict least-recently-accessed if over count budget
        let max_references = inner.config.max_references;
        if inner.entries.len() > max_references {
            let mut by_access: Vec<(u64, String)> = inner
                .entries
                .iter()
                .map(|(id, e)| (e.reference.metadata.last_accessed_at, id.clone()))
                .collect();
            by_access.sort_by_key(|(ts, _)| *ts);
            let overflow = inner.entries.len() - max_references;
            for (_, id) in by_access.into_iter().take(overflow) {
                inner.entries.remove(&id);
                removed += 1;
            }
        }

        inner.recently_cleaned_up = removed;
        inner.cleanup_durations.push(start.elapsed().as_micros());
    }

    /// Cancels any running cleanup timer and restarts it if the new
    /// config enables auto-cleanup.
    pub async fn update_config(self: &Arc<Self>, config: ReferenceStoreConfig) {
        {
            let mut inner = self.inner.lock().await;
            inner.config = config;
        }
        self.restart_cleanup_task().await;
    }

    async fn restart_cleanup_task(self: &Arc<Self>) {
        let mut handle_slot = self.cleanup_handle.lock().await;
        if let Some(handle) = handle_slot.take() {
            handle.abort();
        }
        let (enabled, interval) = {
            let inner = self.inner.lock().await;
            (inner.config.enable_auto_cleanup, inner.config.cleanup_interval())
        };
        if enabled {
            *handle_slot = Some(self.spawn_cleanup_loop(interval));
        }
    }

    /// Starts the recurring cleanup task if `enableAutoCleanup` is set in
    /// the current config. A no-op scheduler loop when disabled.
    pub async fn start_auto_cleanup(self: &Arc<Self>) {
        let (enabled, interval) = {
            let inner = self.inner.lock().await;
            (inner.config.enable_auto_cleanup, inner.config.cleanup_interval())
        };
        if !enabled {
            return;
        }
        let mut handle_slot = self.cleanup_handle.lock().await;
        if handle_slot.is_none() {
            *handle_slot = Some(self.spawn_cleanup_loop(interval));
        }
    }

    pub async fn stop_auto_cleanup(&self) {
        let mut handle_slot = self.cleanup_handle.lock().await;
        if let Some(handle) = handle_slot.take() {
            handle.abort();
        }
    }

    fn spawn_cleanup_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.perform_cleanup().await;
            }
        })
    }
}

impl Inner {
    fn total_storage_bytes(&self) -> u64 {
        self.entries
            .values()
            .filter(|e| e.reference.state == ReferenceState::Active)
            .map(|e| e.bytes.len() as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceStoreConfig;

    fn store_with_threshold(threshold: usize) -> ContentReferenceStore {
        ContentReferenceStore::new(ReferenceStoreConfig {
            size_threshold_bytes: threshold,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn content_addressing_gives_equal_content_the_same_id() {
        let store = store_with_threshold(10);
        let content = b"x".repeat(200);
        let a = store.store_content(&content, StoreOptions::default()).await;
        let b = store.store_content(&content, StoreOptions::default()).await;
        assert_eq!(a.reference_id, b.reference_id);
        assert_eq!(a.reference_id.chars().count(), 43);
    }

    #[tokio::test]
    async fn round_trip_store_and_resolve() {
        let store = store_with_threshold(100);
        let content = b"x".repeat(200);
        let reference = store
            .store_content_if_large(&content, StoreOptions::with_source(ContentSource::McpTool))
            .await
            .expect("content exceeds threshold");
        assert_eq!(reference.state, ReferenceState::Active);
        assert!(reference.preview.len() <= 203);
        assert!(reference.preview.ends_with("..."));

        let (resolved, metadata) = store
            .resolve_reference(&reference.reference_id)
            .await
            .expect("resolve should succeed");
        assert_eq!(resolved, content);
        assert_eq!(metadata.access_count, 1);

        let (_, metadata2) = store.resolve_reference(&reference.reference_id).await.unwrap();
        assert_eq!(metadata2.access_count, 2);
    }

    #[tokio::test]
    async fn small_content_is_not_referenced() {
        let store = store_with_threshold(1000);
        let reference = store.store_content_if_large(b"short", StoreOptions::default()).await;
        assert!(reference.is_none());
    }

    #[tokio::test]
    async fn invalid_id_shape_resolves_as_not_found() {
        let store = store_with_threshold(10);
        let err = store.resolve_reference("too-short").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert!(!err.suggested_actions.is_empty());
    }

    #[tokio::test]
    async fn expired_reference_fails_with_expired_error_type() {
        let store = store_with_threshold(1);
        let reference = store
            .store_content(
                b"large enough content",
                StoreOptions::default().no_expiry(),
            )
            .await;
        // Force near-immediate expiry via a 0ms ttl on a second store call.
        let mut opts = StoreOptions::default();
        opts.ttl_ms = Some(Some(0));
        let expiring = store.store_content(b"different content here", opts).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let err = store.resolve_reference(&expiring.reference_id).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Expired);
        // Unrelated, non-expiring reference remains resolvable.
        assert!(store.resolve_reference(&reference.reference_id).await.is_ok());
    }

    #[tokio::test]
    async fn has_reference_is_true_only_for_active_unexpired_entries() {
        let store = store_with_threshold(1);
        let reference = store.store_content(b"some content", StoreOptions::default()).await;
        assert!(store.has_reference(&reference.reference_id).await);
        store.cleanup_reference(&reference.reference_id).await;
        assert!(!store.has_reference(&reference.reference_id).await);
    }

    #[tokio::test]
    async fn cleanup_removes_pending_and_expired_entries() {
        let store = store_with_threshold(1);
        let reference = store.store_content(b"some content", StoreOptions::default()).await;
        store.cleanup_reference(&reference.reference_id).await;
        store.perform_cleanup().await;
        let stats = store.get_stats().await;
        assert_eq!(stats.active_references, 0);
        assert_eq!(stats.recently_cleaned_up, 1);
    }

    #[tokio::test]
    async fn content_type_detection_recognizes_json_and_html() {
        let store = store_with_threshold(1);
        let json_ref = store.store_content(br#"{"a":1}"#, StoreOptions::default()).await;
        assert_eq!(json_ref.metadata.content_type, ContentType::Json);
        let html_ref = store
            .store_content(b"<!DOCTYPE html><html><body>hi</body></html>", StoreOptions::default())
            .await;
        assert_eq!(html_ref.metadata.content_type, ContentType::Html);
    }
}
