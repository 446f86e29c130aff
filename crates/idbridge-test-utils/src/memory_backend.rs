// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory identity backend for deterministic testing.
//!
//! Enforces email/phone uniqueness, applies patches with partial-update
//! semantics, issues opaque tokens, and records every call so tests can
//! assert on exactly what reached the backend.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;

use idbridge_core::{
    Claims, HealthStatus, IdentityBackend, IdentityError, LookupBy, Patch, PatchField,
    PluginAdapter, Token, UserRecord,
};

/// One call received by a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    FindByEmail(String),
    FindByPhone(String),
    Create {
        fields: Vec<PatchField>,
        email: Option<String>,
        phone_number: Option<String>,
    },
    Update {
        uid: String,
        fields: Vec<PatchField>,
    },
    Delete(String),
    SetClaims {
        uid: String,
        claims: Claims,
    },
    VerifyToken,
}

impl BackendCall {
    pub fn is_verify(&self) -> bool {
        matches!(self, Self::VerifyToken)
    }

    pub fn is_set_claims(&self) -> bool {
        matches!(self, Self::SetClaims { .. })
    }
}

struct StoredUser {
    record: UserRecord,
    has_password: bool,
}

enum IssuedToken {
    Active(Token),
    Revoked,
}

#[derive(Default)]
struct State {
    users: BTreeMap<String, StoredUser>,
    tokens: HashMap<String, IssuedToken>,
    calls: Vec<BackendCall>,
    set_claims_failure: Option<IdentityError>,
}

impl State {
    fn uid_by(&self, matches: impl Fn(&UserRecord) -> bool) -> Option<String> {
        self.users
            .values()
            .find(|u| matches(&u.record))
            .map(|u| u.record.uid.clone())
    }

    /// Rejects identifiers that are malformed or already taken by another account.
    fn check_identifiers(&self, patch: &Patch, own_uid: Option<&str>) -> Result<(), IdentityError> {
        if let Some(email) = &patch.email {
            if !email.contains('@') {
                return Err(IdentityError::Validation(format!("malformed email `{email}`")));
            }
            if let Some(owner) = self.uid_by(|r| r.email.as_deref() == Some(email.as_str()))
                && Some(owner.as_str()) != own_uid
            {
                return Err(IdentityError::Conflict(format!("email `{email}` already registered")));
            }
        }
        if let Some(phone) = &patch.phone_number {
            if !phone.starts_with('+') {
                return Err(IdentityError::Validation(format!(
                    "phone number `{phone}` is not in E.164 format"
                )));
            }
            if let Some(owner) = self.uid_by(|r| r.phone_number.as_deref() == Some(phone.as_str()))
                && Some(owner.as_str()) != own_uid
            {
                return Err(IdentityError::Conflict(format!(
                    "phone number `{phone}` already registered"
                )));
            }
        }
        if let Some(password) = &patch.password {
            use secrecy::ExposeSecret;
            if password.expose_secret().len() < 6 {
                return Err(IdentityError::Validation(
                    "password must be at least 6 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn apply_patch(stored: &mut StoredUser, patch: &Patch) {
    let record = &mut stored.record;
    if let Some(v) = &patch.email {
        record.email = Some(v.clone());
    }
    if let Some(v) = patch.email_verified {
        record.email_verified = v;
    }
    if let Some(v) = &patch.phone_number {
        record.phone_number = Some(v.clone());
    }
    if let Some(v) = &patch.display_name {
        record.display_name = Some(v.clone());
    }
    if let Some(v) = &patch.photo_url {
        record.photo_url = Some(v.clone());
    }
    if let Some(v) = patch.disabled {
        record.disabled = v;
    }
    if let Some(v) = &patch.whatsapp_number {
        record.whatsapp_number = Some(v.clone());
    }
    if patch.password.is_some() {
        stored.has_password = true;
    }
}

/// An identity backend that keeps everything in process memory.
pub struct MemoryBackend {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            latency: None,
        }
    }

    /// Delays every backend call, so tests can overlap or cancel them.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seeds an account directly, bypassing validation and call recording.
    pub async fn insert_user(&self, record: UserRecord) {
        self.state.lock().await.users.insert(
            record.uid.clone(),
            StoredUser {
                record,
                has_password: false,
            },
        );
    }

    /// The stored record for `uid`, if any.
    pub async fn user(&self, uid: &str) -> Option<UserRecord> {
        self.state
            .lock()
            .await
            .users
            .get(uid)
            .map(|u| u.record.clone())
    }

    pub async fn has_password(&self, uid: &str) -> bool {
        self.state
            .lock()
            .await
            .users
            .get(uid)
            .is_some_and(|u| u.has_password)
    }

    /// Issues a token for `uid` that expires `lifetime` from now.
    ///
    /// A negative lifetime yields an already-expired token. The token carries
    /// the account's custom claims as of issuance.
    pub async fn issue_token(&self, uid: &str, lifetime: TimeDelta) -> String {
        let mut state = self.state.lock().await;
        let claims = state
            .users
            .get(uid)
            .map(|u| u.record.custom_claims.clone())
            .unwrap_or_default();
        let now = Utc::now();
        let token = Token::verified(uid, now, now + lifetime)
            .with_issuer("memory-backend")
            .with_audience("idbridge-test")
            .with_sign_in_provider("password")
            .with_claims(claims);
        let raw = format!("mem.{}.{}", uid, uuid::Uuid::new_v4().simple());
        state.tokens.insert(raw.clone(), IssuedToken::Active(token));
        raw
    }

    /// Makes a previously issued token fail verification from now on.
    pub async fn revoke_token(&self, raw_token: &str) {
        if let Some(issued) = self.state.lock().await.tokens.get_mut(raw_token) {
            *issued = IssuedToken::Revoked;
        }
    }

    /// The next `set_claims` call fails with `error` and changes nothing.
    pub async fn fail_next_set_claims(&self, error: IdentityError) {
        self.state.lock().await.set_claims_failure = Some(error);
    }

    /// Every call received so far, in arrival order.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    async fn record(&self, call: BackendCall) -> tokio::sync::MutexGuard<'_, State> {
        // Sleep outside the lock so concurrent callers overlap.
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().await;
        state.calls.push(call);
        state
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, IdentityError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl IdentityBackend for MemoryBackend {
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, IdentityError> {
        let state = self.record(BackendCall::FindByEmail(email.to_owned())).await;
        state
            .uid_by(|r| r.email.as_deref() == Some(email))
            .and_then(|uid| state.users.get(&uid))
            .map(|u| u.record.clone())
            .ok_or_else(|| IdentityError::NotFound {
                by: LookupBy::Email,
                key: email.to_owned(),
            })
    }

    async fn find_by_phone(&self, phone: &str) -> Result<UserRecord, IdentityError> {
        let state = self.record(BackendCall::FindByPhone(phone.to_owned())).await;
        state
            .uid_by(|r| r.phone_number.as_deref() == Some(phone))
            .and_then(|uid| state.users.get(&uid))
            .map(|u| u.record.clone())
            .ok_or_else(|| IdentityError::NotFound {
                by: LookupBy::Phone,
                key: phone.to_owned(),
            })
    }

    async fn create(&self, patch: &Patch) -> Result<UserRecord, IdentityError> {
        let mut state = self
            .record(BackendCall::Create {
                fields: patch.fields(),
                email: patch.email.clone(),
                phone_number: patch.phone_number.clone(),
            })
            .await;
        if !patch.has_identifier() {
            return Err(IdentityError::Validation(
                "an email or phone number is required".to_string(),
            ));
        }
        state.check_identifiers(patch, None)?;

        let uid = uuid::Uuid::new_v4().simple().to_string();
        let mut record = UserRecord::new(&uid);
        record.created_at = Some(Utc::now());
        let mut stored = StoredUser {
            record,
            has_password: false,
        };
        apply_patch(&mut stored, patch);
        let record = stored.record.clone();
        state.users.insert(uid.clone(), stored);
        tracing::debug!(uid = %uid, "memory backend created account");
        Ok(record)
    }

    async fn update(&self, uid: &str, patch: &Patch) -> Result<UserRecord, IdentityError> {
        let mut state = self
            .record(BackendCall::Update {
                uid: uid.to_owned(),
                fields: patch.fields(),
            })
            .await;
        if !state.users.contains_key(uid) {
            return Err(IdentityError::uid_not_found(uid));
        }
        state.check_identifiers(patch, Some(uid))?;
        let stored = state
            .users
            .get_mut(uid)
            .ok_or_else(|| IdentityError::uid_not_found(uid))?;
        apply_patch(stored, patch);
        Ok(stored.record.clone())
    }

    async fn delete(&self, uid: &str) -> Result<(), IdentityError> {
        let mut state = self.record(BackendCall::Delete(uid.to_owned())).await;
        state
            .users
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| IdentityError::uid_not_found(uid))
    }

    async fn set_claims(&self, uid: &str, claims: &Claims) -> Result<(), IdentityError> {
        let mut state = self
            .record(BackendCall::SetClaims {
                uid: uid.to_owned(),
                claims: claims.clone(),
            })
            .await;
        if let Some(error) = state.set_claims_failure.take() {
            return Err(error);
        }
        let stored = state
            .users
            .get_mut(uid)
            .ok_or_else(|| IdentityError::uid_not_found(uid))?;
        stored.record.custom_claims = claims.clone();
        Ok(())
    }

    async fn verify_token(&self, raw_token: &str) -> Result<Token, IdentityError> {
        let state = self.record(BackendCall::VerifyToken).await;
        let token = match state.tokens.get(raw_token) {
            Some(IssuedToken::Active(token)) => token,
            Some(IssuedToken::Revoked) => {
                return Err(IdentityError::InvalidToken("token revoked".to_string()));
            }
            None => {
                return Err(IdentityError::InvalidToken("unrecognized token".to_string()));
            }
        };
        if token.expires_at() <= Utc::now() {
            return Err(IdentityError::ExpiredToken);
        }
        match state.users.get(token.uid()) {
            Some(u) if u.record.disabled => {
                Err(IdentityError::InvalidToken("user disabled".to_string()))
            }
            Some(_) => Ok(token.clone()),
            None => Err(IdentityError::InvalidToken("user not found".to_string())),
        }
    }
}
