// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./idbridge.toml` > `~/.config/idbridge/idbridge.toml` >
//! `/etc/idbridge/idbridge.toml`, with `IDBRIDGE_*` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::IdbridgeConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/idbridge/idbridge.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "idbridge.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idbridge/idbridge.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/idbridge/idbridge.toml`
/// 3. `~/.config/idbridge/idbridge.toml`
/// 4. `./idbridge.toml`
/// 5. `IDBRIDGE_*` environment variables
pub fn load_config() -> Result<IdbridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults.
pub fn load_config_from_str(toml_content: &str) -> Result<IdbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IdbridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file with env var overrides (no hierarchy lookup).
pub fn load_config_from_path(path: &Path) -> Result<IdbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IdbridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(IdbridgeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Maps `IDBRIDGE_<SECTION>_<KEY>` onto `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `request_timeout_secs` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("IDBRIDGE_").map(|key| {
        key.as_str()
            .to_ascii_lowercase()
            .replacen("service_", "service.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("firebase_", "firebase.", 1)
            .into()
    })
}
