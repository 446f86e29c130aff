// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived, single-flight cache of successful token verifications.
//!
//! Entries are keyed by the SHA-256 digest of the raw token, so bearer
//! strings are never retained. Concurrent verifications of the same token
//! share one backend call. Only successes are stored; a rejected token is
//! re-verified on every call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use idbridge_config::CacheConfig;
use idbridge_core::{IdentityBackend, IdentityError, Token};
use moka::Expiry;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

type TokenKey = [u8; 32];

/// Per-entry lifetime: the configured TTL, capped at the token's own expiry.
struct VerificationExpiry {
    ttl: Duration,
}

impl Expiry<TokenKey, Token> for VerificationExpiry {
    fn expire_after_create(
        &self,
        _key: &TokenKey,
        token: &Token,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.ttl.min(token.ttl_remaining(Utc::now())))
    }
}

/// Verification cache in front of an [`IdentityBackend`].
#[derive(Clone)]
pub struct TokenCache {
    entries: Option<Cache<TokenKey, Token>>,
}

impl TokenCache {
    /// A bounded LRU cache reusing successes for `ttl`.
    ///
    /// A zero `ttl` or `max_entries` disables caching.
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        if ttl.is_zero() || max_entries == 0 {
            return Self::disabled();
        }
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(VerificationExpiry { ttl })
            .support_invalidation_closures()
            .build();
        Self {
            entries: Some(entries),
        }
    }

    /// A cache that forwards every call to the backend.
    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new(config.ttl(), config.max_entries)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Verifies `raw_token`, reusing a live cached success when there is one.
    pub async fn verify(
        &self,
        raw_token: &str,
        backend: &dyn IdentityBackend,
    ) -> Result<Token, IdentityError> {
        let Some(entries) = &self.entries else {
            return backend.verify_token(raw_token).await;
        };

        let key = fingerprint(raw_token);
        let entry = entries
            .entry(key)
            .or_try_insert_with(backend.verify_token(raw_token))
            .await
            .map_err(Arc::unwrap_or_clone)?;

        debug!(
            token = %short_hex(&key),
            uid = entry.value().uid(),
            cache_hit = !entry.is_fresh(),
            "token verified"
        );
        Ok(entry.into_value())
    }

    /// Drops the cached verification of one token, if any.
    pub async fn invalidate(&self, raw_token: &str) {
        if let Some(entries) = &self.entries {
            entries.invalidate(&fingerprint(raw_token)).await;
        }
    }

    /// Drops every cached verification issued to `uid`.
    pub fn invalidate_uid(&self, uid: &str) {
        let Some(entries) = &self.entries else {
            return;
        };
        let uid = uid.to_owned();
        if let Err(e) = entries.invalidate_entries_if(move |_, token| token.uid() == uid) {
            // Only fails when closures are unsupported; fall back to a full flush.
            warn!(error = %e, "per-user invalidation unavailable, clearing token cache");
            entries.invalidate_all();
        }
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.invalidate_all();
        }
    }

    /// Number of live entries after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        match &self.entries {
            Some(entries) => {
                entries.run_pending_tasks().await;
                entries.entry_count()
            }
            None => 0,
        }
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn fingerprint(raw_token: &str) -> TokenKey {
    Sha256::digest(raw_token.as_bytes()).into()
}

fn short_hex(key: &TokenKey) -> String {
    hex::encode(&key[..4])
}
