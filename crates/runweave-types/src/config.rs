//! Runner configuration types.
//!
//! `RunnerConfig` represents the top-level `config.toml` that controls
//! service routing, stream timeouts, and loader cache sizing. Every field
//! has a default so a missing or partial file still yields a working
//! configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the run-execution layer.
///
/// Loaded from `{data_dir}/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub services: ServiceSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Service registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service ids seeded as Active when the registry is constructed.
    /// Ids referenced only by preference lists are registered lazily.
    #[serde(default)]
    pub known: Vec<String>,

    /// How long a transient fault keeps a service in cooldown.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Model id -> ordered service preference list (preferred first).
    #[serde(default)]
    pub model_preferences: HashMap<String, Vec<String>>,
}

fn default_cooldown_secs() -> u64 {
    900
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            known: Vec::new(),
            cooldown_secs: default_cooldown_secs(),
            model_preferences: HashMap::new(),
        }
    }
}

/// Stream guard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Activity timeout: the stream fails if no event arrives within this
    /// window of the previous one.
    #[serde(default = "default_stream_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_stream_timeout_ms() -> u64 {
    60_000
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_stream_timeout_ms(),
        }
    }
}

/// Bounds for one loader cache family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheLimits {
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_bytes")]
    pub max_bytes: usize,
}

fn default_cache_entries() -> usize {
    256
}

fn default_cache_bytes() -> usize {
    // 16 MiB per family
    16 * 1024 * 1024
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            max_bytes: default_cache_bytes(),
        }
    }
}

/// Loader cache settings, one independent bound per object family.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub routines: CacheLimits,
    #[serde(default)]
    pub projects: CacheLimits,
}
