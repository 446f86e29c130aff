// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! idbridge: account management and bearer token verification over a
//! pluggable identity provider.
//!
//! ```no_run
//! # async fn run() -> Result<(), idbridge::IdentityError> {
//! use std::sync::Arc;
//! use idbridge::{CancellationToken, StaticAccessToken, User};
//!
//! let config = idbridge::load_config()?;
//! idbridge::init_tracing(&config.service.log_level);
//! let service = idbridge::connect(&config, Arc::new(StaticAccessToken::emulator()))?;
//!
//! let cancel = CancellationToken::new();
//! let mut user = User::default();
//! user.email = "ada@example.com".into();
//! let record = service.create_user(&user, &cancel).await?;
//! println!("created {}", record.uid);
//! # Ok(())
//! # }
//! ```

pub use idbridge_config::{
    CacheConfig, ConfigError, FirebaseConfig, IdbridgeConfig, ServiceConfig, render_errors,
};
pub use idbridge_core::{
    Claims, HealthStatus, IdentityBackend, IdentityError, LookupBy, Patch, PatchField,
    PluginAdapter, Token, User, UserRecord,
};
pub use idbridge_identity::{
    CancellationToken, IdentityService, TokenCache, build_patch, merge_claims,
};

#[cfg(feature = "firebase")]
pub use idbridge_firebase::{AccessTokenSource, FirebaseBackend, StaticAccessToken};

use idbridge_config::validation::validate_config;

/// Loads configuration from the file hierarchy and environment and
/// validates it. All problems are joined into one `Config` error; use
/// [`idbridge_config::load_and_validate`] with [`render_errors`] for rich
/// diagnostics.
pub fn load_config() -> Result<IdbridgeConfig, IdentityError> {
    idbridge_config::load_and_validate().map_err(|errors| config_error(&errors))
}

fn config_error(errors: &[ConfigError]) -> IdentityError {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    IdentityError::Config(messages.join("; "))
}

/// Validates `config` and builds an [`IdentityService`] over the Firebase
/// backend it describes.
#[cfg(feature = "firebase")]
pub fn connect(
    config: &IdbridgeConfig,
    tokens: std::sync::Arc<dyn AccessTokenSource>,
) -> Result<IdentityService, IdentityError> {
    validate_config(config).map_err(|errors| config_error(&errors))?;
    let backend = FirebaseBackend::connect(&config.firebase, tokens)?;
    Ok(IdentityService::from_config(
        std::sync::Arc::new(backend),
        config,
    ))
}

/// Validates `config` and builds an [`IdentityService`] over any backend.
pub fn connect_with(
    config: &IdbridgeConfig,
    backend: std::sync::Arc<dyn IdentityBackend>,
) -> Result<IdentityService, IdentityError> {
    validate_config(config).map_err(|errors| config_error(&errors))?;
    Ok(IdentityService::from_config(backend, config))
}

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over
/// `log_level`, which applies to idbridge crates only.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_filter(log_level)));

    // A subscriber installed by the host application wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

fn tracing_filter(log_level: &str) -> String {
    format!("idbridge={log_level},warn")
}
