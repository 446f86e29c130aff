// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Collects every violation instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::IdbridgeConfig;

/// Longest verification reuse window accepted. Cached tokens must stay well
/// below typical one-hour token lifetimes.
pub const MAX_CACHE_TTL_SECS: u64 = 300;

pub fn validate_config(config: &IdbridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.service.request_timeout_secs == 0 {
        fail("service.request_timeout_secs must be greater than 0".to_string());
    }

    const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if !LEVELS.contains(&config.service.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "service.log_level `{}` is not one of {}",
            config.service.log_level,
            LEVELS.join(", ")
        ));
    }

    if config.cache.ttl_secs > MAX_CACHE_TTL_SECS {
        fail(format!(
            "cache.ttl_secs must be at most {MAX_CACHE_TTL_SECS}, got {}",
            config.cache.ttl_secs
        ));
    }

    if config.cache.enabled && config.cache.max_entries == 0 {
        fail("cache.max_entries must be greater than 0 when the cache is enabled".to_string());
    }

    let base = config.firebase.api_base_url.trim();
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        fail(format!(
            "firebase.api_base_url `{base}` must start with http:// or https://"
        ));
    }

    if let Some(project) = &config.firebase.project_id
        && project.trim().is_empty()
    {
        fail("firebase.project_id must not be empty when set".to_string());
    }

    if config.firebase.timeout_secs == 0 {
        fail("firebase.timeout_secs must be greater than 0".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
