//! Runtime configuration for the memory window and content reference
//! store: a TOML file if present at the given path, hard defaults
//! otherwise. Environment variables are consulted at the call site that
//! owns them (`CA_FORM_GUIDANCE_ENABLED` is read fresh on every guidance
//! lookup, not cached here).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the environment variable gating field guidance resolution.
/// `"false"` disables both guidance getters; anything else (including
/// unset) behaves as `"true"`.
pub const GUIDANCE_ENABLED_ENV: &str = "CA_FORM_GUIDANCE_ENABLED";

pub fn guidance_enabled() -> bool {
    match std::env::var(GUIDANCE_ENABLED_ENV) {
        Ok(v) => v != "false",
        Err(_) => true,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub memory_window: MemoryWindowConfig,
    pub reference_store: ReferenceStoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryWindowConfig {
    pub max_tokens: usize,
    pub reserve_tokens: usize,
}

impl Default for MemoryWindowConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8_000,
            reserve_tokens: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePolicy {
    pub max_age_ms: u64,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceStoreConfig {
    pub size_threshold_bytes: usize,
    pub max_references: usize,
    pub max_total_storage_bytes: u64,
    pub default_ttl_ms: Option<u64>,
    pub enable_auto_cleanup: bool,
    pub cleanup_interval_ms: u64,
    pub recent_policy: SourcePolicy,
    pub user_content_policy: SourcePolicy,
    pub agent_generated_policy: SourcePolicy,
    pub default_policy: SourcePolicy,
}

impl ReferenceStoreConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

impl Default for ReferenceStoreConfig {
    fn default() -> Self {
        Self {
            size_threshold_bytes: 4_096,
            max_references: 10_000,
            max_total_storage_bytes: 256 * 1024 * 1024,
            default_ttl_ms: Some(24 * 60 * 60 * 1000),
            enable_auto_cleanup: true,
            cleanup_interval_ms: 5 * 60 * 1000,
            recent_policy: SourcePolicy {
                max_age_ms: 30 * 60 * 1000,
                priority: 10,
            },
            user_content_policy: SourcePolicy {
                max_age_ms: 7 * 24 * 60 * 60 * 1000,
                priority: 40,
            },
            agent_generated_policy: SourcePolicy {
                max_age_ms: 24 * 60 * 60 * 1000,
                priority: 20,
            },
            default_policy: SourcePolicy {
                max_age_ms: 24 * 60 * 60 * 1000,
                priority: 30,
            },
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_window: MemoryWindowConfig::default(),
            reference_store: ReferenceStoreConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}
