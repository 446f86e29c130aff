// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity Toolkit v1 request and response bodies.

use chrono::{DateTime, TimeZone, Utc};
use idbridge_core::{Claims, IdentityError, Patch, UserRecord};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// `accounts:lookup` request. Exactly one selector is set per call.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phone_number: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub local_id: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub users: Vec<AccountInfo>,
}

/// A user as returned by `accounts:lookup`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub local_id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    /// Custom claims, serialized as a JSON object string.
    pub custom_attributes: Option<String>,
    /// Milliseconds since the epoch, as a decimal string.
    pub created_at: Option<String>,
    pub last_login_at: Option<String>,
}

impl AccountInfo {
    pub fn into_record(self) -> Result<UserRecord, IdentityError> {
        let custom_claims = match self.custom_attributes.as_deref() {
            None | Some("") => Claims::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                IdentityError::Backend(format!(
                    "malformed customAttributes for `{}`: {e}",
                    self.local_id
                ))
            })?,
        };
        Ok(UserRecord {
            email: self.email,
            email_verified: self.email_verified,
            phone_number: self.phone_number,
            display_name: self.display_name,
            photo_url: self.photo_url,
            disabled: self.disabled,
            custom_claims,
            whatsapp_number: None,
            created_at: self.created_at.as_deref().and_then(parse_millis),
            last_sign_in_at: self.last_login_at.as_deref().and_then(parse_millis),
            uid: self.local_id,
        })
    }
}

fn parse_millis(raw: &str) -> Option<DateTime<Utc>> {
    let millis = raw.parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// `accounts` (admin sign-up) request.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
}

impl<'a> From<&'a Patch> for SignUpRequest<'a> {
    fn from(patch: &'a Patch) -> Self {
        Self {
            email: patch.email.as_deref(),
            email_verified: patch.email_verified,
            phone_number: patch.phone_number.as_deref(),
            display_name: patch.display_name.as_deref(),
            photo_url: patch.photo_url.as_deref(),
            disabled: patch.disabled,
            password: patch.password.as_ref().map(|p| p.expose_secret()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub local_id: String,
}

/// `accounts:update` request.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest<'a> {
    pub local_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<String>,
}

impl<'a> UpdateRequest<'a> {
    pub fn from_patch(local_id: &'a str, patch: &'a Patch) -> Self {
        Self {
            local_id,
            email: patch.email.as_deref(),
            email_verified: patch.email_verified,
            phone_number: patch.phone_number.as_deref(),
            display_name: patch.display_name.as_deref(),
            photo_url: patch.photo_url.as_deref(),
            disable_user: patch.disabled,
            password: patch.password.as_ref().map(|p| p.expose_secret()),
            custom_attributes: None,
        }
    }

    pub fn claims(local_id: &'a str, claims: &Claims) -> Result<Self, IdentityError> {
        let encoded = serde_json::to_string(claims)
            .map_err(|e| IdentityError::Validation(format!("claims are not serializable: {e}")))?;
        Ok(Self {
            local_id,
            custom_attributes: Some(encoded),
            ..Self::default()
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<'a> {
    pub local_id: &'a str,
}

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    pub message: String,
}
