// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operations exposed to callers.

use std::sync::Arc;
use std::time::Duration;

use idbridge_config::IdbridgeConfig;
use idbridge_core::{Claims, IdentityBackend, IdentityError, Token, User, UserRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::TokenCache;
use crate::cancel::guarded;
use crate::claims::merge_claims;
use crate::patch::{build_patch, require_identifier};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Account management and token verification over an injected backend.
///
/// Every operation honors the caller's [`CancellationToken`] and the
/// configured request timeout, both surfacing as [`IdentityError::Cancelled`].
pub struct IdentityService {
    backend: Arc<dyn IdentityBackend>,
    cache: TokenCache,
    request_timeout: Duration,
}

impl IdentityService {
    /// A service with the default timeout and the given cache.
    pub fn new(backend: Arc<dyn IdentityBackend>, cache: TokenCache) -> Self {
        Self {
            backend,
            cache,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(backend: Arc<dyn IdentityBackend>, config: &IdbridgeConfig) -> Self {
        info!(
            backend = backend.name(),
            cache_enabled = config.cache.enabled,
            cache_ttl_secs = config.cache.ttl_secs,
            "identity service initialized"
        );
        Self::new(backend, TokenCache::from_config(&config.cache))
            .with_request_timeout(config.service.request_timeout())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &Arc<dyn IdentityBackend> {
        &self.backend
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Creates an account, then sets its custom claims if any were given.
    ///
    /// A claims failure after a successful create is reported as
    /// [`IdentityError::ClaimsSet`] carrying the created record.
    pub async fn create_user(
        &self,
        user: &User,
        cancel: &CancellationToken,
    ) -> Result<UserRecord, IdentityError> {
        let patch = build_patch(user);
        require_identifier(&patch)?;
        if !user.uid.is_empty() {
            debug!(uid = %user.uid, "ignoring caller uid on create; the backend assigns one");
        }

        guarded("create_user", cancel, self.request_timeout, async {
            let record = self.backend.create(&patch).await?;
            info!(uid = %record.uid, fields = ?patch.fields(), "account created");
            self.apply_claims(record, &user.custom_claims).await
        })
        .await
    }

    /// Applies the non-empty fields of `user` to the account `user.uid`.
    ///
    /// Incoming custom claims are merged over the stored ones.
    pub async fn update_user(
        &self,
        user: &User,
        cancel: &CancellationToken,
    ) -> Result<UserRecord, IdentityError> {
        require_uid(user, "update")?;
        let patch = build_patch(user);

        guarded("update_user", cancel, self.request_timeout, async {
            let record = self.backend.update(&user.uid, &patch).await?;
            info!(uid = %record.uid, fields = ?patch.fields(), "account updated");
            // The account is disabled from here on, whatever the claims call does.
            if record.disabled {
                self.cache.invalidate_uid(&record.uid);
            }
            self.apply_claims(record, &user.custom_claims).await
        })
        .await
    }

    /// Deletes the account `user.uid` and drops its cached verifications.
    pub async fn delete_user(
        &self,
        user: &User,
        cancel: &CancellationToken,
    ) -> Result<(), IdentityError> {
        require_uid(user, "delete")?;
        guarded(
            "delete_user",
            cancel,
            self.request_timeout,
            self.backend.delete(&user.uid),
        )
        .await?;
        self.cache.invalidate_uid(&user.uid);
        info!(uid = %user.uid, "account deleted");
        Ok(())
    }

    pub async fn get_user_by_email(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<UserRecord, IdentityError> {
        guarded(
            "get_user_by_email",
            cancel,
            self.request_timeout,
            self.backend.find_by_email(email),
        )
        .await
    }

    pub async fn get_user_by_phone(
        &self,
        phone: &str,
        cancel: &CancellationToken,
    ) -> Result<UserRecord, IdentityError> {
        guarded(
            "get_user_by_phone",
            cancel,
            self.request_timeout,
            self.backend.find_by_phone(phone),
        )
        .await
    }

    /// Replaces the custom claims of `uid` wholesale, without merging.
    pub async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &Claims,
        cancel: &CancellationToken,
    ) -> Result<(), IdentityError> {
        if uid.is_empty() {
            return Err(IdentityError::Validation(
                "a uid is required to set custom claims".to_string(),
            ));
        }
        guarded(
            "set_custom_claims",
            cancel,
            self.request_timeout,
            self.backend.set_claims(uid, claims),
        )
        .await?;
        info!(uid, keys = claims.len(), "custom claims replaced");
        Ok(())
    }

    /// Verifies a raw bearer token through the verification cache.
    pub async fn verify_token(
        &self,
        raw_token: &str,
        cancel: &CancellationToken,
    ) -> Result<Token, IdentityError> {
        if raw_token.trim().is_empty() {
            return Err(IdentityError::InvalidToken("empty token".to_string()));
        }
        let outcome = guarded(
            "verify_token",
            cancel,
            self.request_timeout,
            self.cache.verify(raw_token, self.backend.as_ref()),
        )
        .await;
        if let Err(e) = &outcome
            && e.is_token_error()
        {
            debug!(error = %e, "token rejected");
        }
        outcome
    }

    /// Forgets any cached verification of `raw_token`.
    pub async fn invalidate_token(&self, raw_token: &str) {
        self.cache.invalidate(raw_token).await;
    }

    /// Merges `incoming` over the record's claims and stores the result.
    async fn apply_claims(
        &self,
        mut record: UserRecord,
        incoming: &Claims,
    ) -> Result<UserRecord, IdentityError> {
        if incoming.is_empty() {
            return Ok(record);
        }
        let merged = merge_claims(&record.custom_claims, incoming);
        match self.backend.set_claims(&record.uid, &merged).await {
            Ok(()) => {
                debug!(uid = %record.uid, keys = merged.len(), "custom claims set");
                record.custom_claims = merged;
                Ok(record)
            }
            Err(source) => {
                warn!(uid = %record.uid, error = %source, "account written but claims call failed");
                Err(IdentityError::ClaimsSet {
                    record: Box::new(record),
                    source: Box::new(source),
                })
            }
        }
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("backend", &self.backend.name())
            .field("cache", &self.cache)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn require_uid(user: &User, operation: &str) -> Result<(), IdentityError> {
    if user.uid.is_empty() {
        Err(IdentityError::Validation(format!(
            "a uid is required to {operation} an account"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use idbridge_core::PatchField;
    use idbridge_test_utils::{BackendCall, MemoryBackend, claims};
    use secrecy::SecretString;
    use serde_json::json;
    use tracing_test::traced_test;

    fn service(backend: &Arc<MemoryBackend>) -> IdentityService {
        IdentityService::new(backend.clone(), TokenCache::new(Duration::from_secs(5), 100))
    }

    fn email_user(email: &str) -> User {
        User {
            email: email.into(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn create_with_claims_issues_create_then_set_claims() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let user = User {
            custom_claims: claims(json!({"role": "admin"})),
            ..email_user("a@b.com")
        };

        let record = svc.create_user(&user, &CancellationToken::new()).await.unwrap();

        assert!(!record.uid.is_empty());
        assert!(!record.disabled);
        assert_eq!(record.custom_claims, claims(json!({"role": "admin"})));
        let calls = backend.calls().await;
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            BackendCall::Create { fields, email, phone_number } => {
                assert_eq!(fields, &vec![PatchField::Email]);
                assert_eq!(email.as_deref(), Some("a@b.com"));
                assert!(phone_number.is_none());
            }
            other => panic!("expected create, got {other:?}"),
        }
        assert_eq!(
            calls[1],
            BackendCall::SetClaims {
                uid: record.uid.clone(),
                claims: claims(json!({"role": "admin"})),
            }
        );
    }

    #[tokio::test]
    async fn create_without_claims_skips_second_call() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);

        svc.create_user(&email_user("a@b.com"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn create_without_identifier_never_reaches_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let user = User {
            display_name: "Nobody".into(),
            ..User::default()
        };

        let err = svc.create_user(&user, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, IdentityError::Validation(_)));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();

        svc.create_user(&email_user("a@b.com"), &cancel).await.unwrap();
        let err = svc.create_user(&email_user("a@b.com"), &cancel).await.unwrap_err();

        assert!(matches!(err, IdentityError::Conflict(_)));
    }

    #[tokio::test]
    async fn claims_failure_keeps_created_record() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .fail_next_set_claims(IdentityError::Backend("claims service unavailable".into()))
            .await;
        let svc = service(&backend);
        let user = User {
            custom_claims: claims(json!({"role": "admin"})),
            ..email_user("a@b.com")
        };

        let err = svc.create_user(&user, &CancellationToken::new()).await.unwrap_err();

        let IdentityError::ClaimsSet { record, source } = err else {
            panic!("expected ClaimsSet");
        };
        assert!(matches!(*source, IdentityError::Backend(_)));
        let stored = backend.user(&record.uid).await.expect("record was not rolled back");
        assert_eq!(stored.email.as_deref(), Some("a@b.com"));
        assert!(stored.custom_claims.is_empty());
    }

    #[tokio::test]
    async fn update_merges_claims_and_leaves_unset_fields() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc
            .create_user(
                &User {
                    display_name: "Ann".into(),
                    custom_claims: claims(json!({"role": "user", "tenant": "acme"})),
                    ..email_user("ann@example.com")
                },
                &cancel,
            )
            .await
            .unwrap();

        let update = User {
            uid: created.uid.clone(),
            photo_url: "https://example.com/ann.png".into(),
            custom_claims: claims(json!({"role": "admin"})),
            ..User::default()
        };
        let updated = svc.update_user(&update, &cancel).await.unwrap();

        assert_eq!(updated.display_name.as_deref(), Some("Ann"));
        assert_eq!(updated.photo_url.as_deref(), Some("https://example.com/ann.png"));
        assert_eq!(
            updated.custom_claims,
            claims(json!({"role": "admin", "tenant": "acme"}))
        );
        let last = backend.calls().await.pop().unwrap();
        assert_eq!(
            last,
            BackendCall::SetClaims {
                uid: created.uid.clone(),
                claims: claims(json!({"role": "admin", "tenant": "acme"})),
            }
        );
    }

    #[tokio::test]
    async fn update_without_password_leaves_it_untouched() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc
            .create_user(
                &User {
                    password: Some(SecretString::from("initial-pass".to_string())),
                    ..email_user("a@b.com")
                },
                &cancel,
            )
            .await
            .unwrap();

        let update = User {
            uid: created.uid.clone(),
            display_name: "Renamed".into(),
            ..User::default()
        };
        svc.update_user(&update, &cancel).await.unwrap();

        match backend.calls().await.pop().unwrap() {
            BackendCall::Update { fields, .. } => {
                assert_eq!(fields, vec![PatchField::DisplayName]);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert!(backend.has_password(&created.uid).await);
    }

    #[tokio::test]
    async fn update_requires_uid() {
        let backend = Arc::new(MemoryBackend::new());
        let err = service(&backend)
            .update_user(&email_user("a@b.com"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn update_unknown_uid_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let user = User {
            display_name: "Ghost".into(),
            ..User::with_uid("missing")
        };
        let err = service(&backend)
            .update_user(&user, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let err = service(&backend)
            .delete_user(&User::with_uid("u1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_drops_cached_tokens_for_user() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc.create_user(&email_user("a@b.com"), &cancel).await.unwrap();
        let raw = backend.issue_token(&created.uid, TimeDelta::hours(1)).await;

        svc.verify_token(&raw, &cancel).await.unwrap();
        svc.delete_user(&User::with_uid(&created.uid), &cancel).await.unwrap();
        let err = svc.verify_token(&raw, &cancel).await.unwrap_err();

        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn disabling_user_drops_cached_tokens() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc.create_user(&email_user("a@b.com"), &cancel).await.unwrap();
        let raw = backend.issue_token(&created.uid, TimeDelta::hours(1)).await;
        svc.verify_token(&raw, &cancel).await.unwrap();

        let disable = User {
            disabled: true,
            ..User::with_uid(&created.uid)
        };
        svc.update_user(&disable, &cancel).await.unwrap();

        assert!(svc.verify_token(&raw, &cancel).await.is_err());
    }

    #[tokio::test]
    async fn disabling_user_drops_cached_tokens_even_if_claims_fail() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc.create_user(&email_user("a@b.com"), &cancel).await.unwrap();
        let raw = backend.issue_token(&created.uid, TimeDelta::hours(1)).await;
        svc.verify_token(&raw, &cancel).await.unwrap();

        backend
            .fail_next_set_claims(IdentityError::Backend("claims service unavailable".into()))
            .await;
        let disable = User {
            disabled: true,
            custom_claims: claims(json!({"r": 1})),
            ..User::with_uid(&created.uid)
        };
        let err = svc.update_user(&disable, &cancel).await.unwrap_err();

        let IdentityError::ClaimsSet { record, .. } = err else {
            panic!("expected ClaimsSet");
        };
        assert!(record.disabled);
        assert!(backend.user(&created.uid).await.unwrap().disabled);
        assert!(svc.verify_token(&raw, &cancel).await.is_err());
        assert_eq!(backend.count_calls(BackendCall::is_verify).await, 2);
    }

    #[tokio::test]
    async fn lookups_pass_through() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc
            .create_user(
                &User {
                    phone_number: "+15550100".into(),
                    ..email_user("a@b.com")
                },
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(svc.get_user_by_email("a@b.com", &cancel).await.unwrap().uid, created.uid);
        assert_eq!(svc.get_user_by_phone("+15550100", &cancel).await.unwrap().uid, created.uid);
        assert!(svc.get_user_by_email("x@b.com", &cancel).await.unwrap_err().is_not_found());
        assert!(svc.get_user_by_phone("+15550199", &cancel).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn set_custom_claims_replaces_without_merge() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc
            .create_user(
                &User {
                    custom_claims: claims(json!({"role": "user", "tenant": "acme"})),
                    ..email_user("a@b.com")
                },
                &cancel,
            )
            .await
            .unwrap();

        svc.set_custom_claims(&created.uid, &claims(json!({"role": "admin"})), &cancel)
            .await
            .unwrap();

        let stored = backend.user(&created.uid).await.unwrap();
        assert_eq!(stored.custom_claims, claims(json!({"role": "admin"})));
    }

    #[tokio::test]
    async fn empty_token_is_rejected_locally() {
        let backend = Arc::new(MemoryBackend::new());
        let err = service(&backend)
            .verify_token("  ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_caller_gets_cancelled_error() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_secs(5)));
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = svc
            .get_user_by_email("a@b.com", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Cancelled(_)));
    }

    #[tokio::test]
    async fn request_timeout_yields_cancelled() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_secs(5)));
        let svc = service(&backend).with_request_timeout(Duration::from_millis(30));

        let err = svc
            .delete_user(&User::with_uid("u1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Cancelled(msg) if msg.contains("deadline")));
    }

    #[tokio::test]
    #[traced_test]
    async fn secrets_are_not_logged() {
        let backend = Arc::new(MemoryBackend::new());
        let svc = service(&backend);
        let cancel = CancellationToken::new();
        let created = svc
            .create_user(
                &User {
                    password: Some(SecretString::from("pa55word-do-not-log".to_string())),
                    ..email_user("a@b.com")
                },
                &cancel,
            )
            .await
            .unwrap();
        let raw = backend.issue_token(&created.uid, TimeDelta::hours(1)).await;
        svc.verify_token(&raw, &cancel).await.unwrap();

        assert!(logs_contain("account created"));
        assert!(!logs_contain("pa55word-do-not-log"));
        assert!(!logs_contain(&raw));
    }
}
