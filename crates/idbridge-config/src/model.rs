// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so misspelled keys are
//! rejected at startup instead of silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdbridgeConfig {
    /// Identity service behavior.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Token verification cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Firebase Authentication backend.
    #[serde(default)]
    pub firebase: FirebaseConfig,
}

/// Identity service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Upper bound on any single operation, including the follow-up claims call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Token verification cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// When false every verification goes to the backend.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// How long a successful verification is reused. Capped at token expiry.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached verifications before LRU eviction.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    5
}

fn default_max_entries() -> u64 {
    10_000
}

/// Firebase Authentication backend configuration.
///
/// Service-account credentials are not configured here; an access token
/// source is handed to the backend by the embedding application.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FirebaseConfig {
    /// Google Cloud project id. Required to construct the backend.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Identity Toolkit REST endpoint.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Web API key, sent as the `key` query parameter when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP client timeout for a single provider request.
    #[serde(default = "default_firebase_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_base_url: default_api_base_url(),
            api_key: None,
            timeout_secs: default_firebase_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_base_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_firebase_timeout_secs() -> u64 {
    30
}
