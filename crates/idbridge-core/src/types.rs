// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by the identity service and backend adapters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Custom claims attached to an account and surfaced in its tokens.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Caller-side description of an account.
///
/// Empty strings and `false` mean "not set". On update, unset fields are left
/// untouched on the backend, so a field cannot be cleared through this type.
#[derive(Debug, Default)]
pub struct User {
    /// Backend-assigned identifier. Empty before the account is created.
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub phone_number: String,
    pub display_name: String,
    pub photo_url: String,
    pub disabled: bool,
    /// Write-only. Never returned by the backend.
    pub password: Option<SecretString>,
    pub custom_claims: Claims,
    /// Domain extension field with no counterpart in most provider schemas.
    pub whatsapp_number: String,
}

impl User {
    /// A user value that only names an existing account.
    pub fn with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }
}

impl Clone for User {
    fn clone(&self) -> Self {
        Self {
            uid: self.uid.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            phone_number: self.phone_number.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            disabled: self.disabled,
            password: self
                .password
                .as_ref()
                .map(|p| SecretString::from(p.expose_secret().to_owned())),
            custom_claims: self.custom_claims.clone(),
            whatsapp_number: self.whatsapp_number.clone(),
        }
    }
}

/// An account as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub custom_claims: Claims,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// An otherwise empty record for the given uid.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            email_verified: false,
            phone_number: None,
            display_name: None,
            photo_url: None,
            disabled: false,
            custom_claims: Claims::new(),
            whatsapp_number: None,
            created_at: None,
            last_sign_in_at: None,
        }
    }
}

/// Names of the fields a [`Patch`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PatchField {
    Email,
    EmailVerified,
    PhoneNumber,
    DisplayName,
    PhotoUrl,
    Disabled,
    Password,
    WhatsappNumber,
}

/// The minimal set of field changes derived from a [`User`].
///
/// `None` means "leave the stored value untouched".
#[derive(Debug, Default)]
pub struct Patch {
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub disabled: Option<bool>,
    pub password: Option<SecretString>,
    pub whatsapp_number: Option<String>,
}

impl Patch {
    /// Fields present in this patch, in declaration order.
    pub fn fields(&self) -> Vec<PatchField> {
        let present = [
            (PatchField::Email, self.email.is_some()),
            (PatchField::EmailVerified, self.email_verified.is_some()),
            (PatchField::PhoneNumber, self.phone_number.is_some()),
            (PatchField::DisplayName, self.display_name.is_some()),
            (PatchField::PhotoUrl, self.photo_url.is_some()),
            (PatchField::Disabled, self.disabled.is_some()),
            (PatchField::Password, self.password.is_some()),
            (PatchField::WhatsappNumber, self.whatsapp_number.is_some()),
        ];
        present
            .into_iter()
            .filter_map(|(field, set)| set.then_some(field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn contains(&self, field: PatchField) -> bool {
        self.fields().contains(&field)
    }

    /// True when the patch carries at least one unique account identifier.
    pub fn has_identifier(&self) -> bool {
        self.email.is_some() || self.phone_number.is_some()
    }
}

/// A verified identity assertion.
///
/// Only backends produce tokens, via [`Token::verified`] after a successful
/// verification. Callers receive them from the identity service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    uid: String,
    issuer: String,
    audience: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    auth_time: Option<DateTime<Utc>>,
    sign_in_provider: Option<String>,
    claims: Claims,
}

impl Token {
    /// Builds a token from a verification the backend has already performed.
    pub fn verified(
        uid: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: uid.into(),
            issuer: String::new(),
            audience: String::new(),
            issued_at,
            expires_at,
            auth_time: None,
            sign_in_provider: None,
            claims: Claims::new(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn with_auth_time(mut self, auth_time: DateTime<Utc>) -> Self {
        self.auth_time = Some(auth_time);
        self
    }

    pub fn with_sign_in_provider(mut self, provider: impl Into<String>) -> Self {
        self.sign_in_provider = Some(provider.into());
        self
    }

    pub fn with_claims(mut self, claims: Claims) -> Self {
        self.claims = claims;
        self
    }

    /// The subject of the token.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn auth_time(&self) -> Option<DateTime<Utc>> {
        self.auth_time
    }

    pub fn sign_in_provider(&self) -> Option<&str> {
        self.sign_in_provider.as_deref()
    }

    /// Custom claims carried by the token.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.claims.get(name)
    }

    /// Time left before expiry, or zero if already expired at `now`.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}
