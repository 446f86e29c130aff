// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads the payload of a Firebase ID token.
//!
//! No signature check happens here: the provider verifies the token
//! server-side and this module only extracts what it asserts.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use idbridge_core::{Claims, IdentityError, Token};
use serde::Deserialize;

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Claims Firebase sets on every ID token; everything else is custom.
const PROVIDER_CLAIMS: [&str; 10] = [
    "user_id",
    "email",
    "email_verified",
    "phone_number",
    "name",
    "picture",
    "nbf",
    "jti",
    "uid",
    "provider_id",
];

#[derive(Debug, Default, Deserialize)]
struct FirebaseSection {
    sign_in_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdTokenPayload {
    #[serde(default)]
    iss: String,
    #[serde(default)]
    aud: String,
    pub(crate) sub: String,
    iat: i64,
    pub(crate) exp: i64,
    auth_time: Option<i64>,
    #[serde(default)]
    firebase: FirebaseSection,
    #[serde(flatten)]
    rest: Claims,
}

impl IdTokenPayload {
    /// Decodes the middle segment of a compact JWT.
    pub(crate) fn decode(raw_token: &str) -> Result<Self, IdentityError> {
        let mut segments = raw_token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(IdentityError::InvalidToken("malformed token".to_string())),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IdentityError::InvalidToken(format!("token payload is not base64url: {e}")))?;
        let decoded: Self = serde_json::from_slice(&bytes)
            .map_err(|e| IdentityError::InvalidToken(format!("token payload is not valid: {e}")))?;
        if decoded.sub.is_empty() {
            return Err(IdentityError::InvalidToken("token has no subject".to_string()));
        }
        Ok(decoded)
    }

    /// Rejects tokens minted for a different Firebase project.
    pub(crate) fn check_project(&self, project_id: &str) -> Result<(), IdentityError> {
        if self.aud != project_id {
            return Err(IdentityError::InvalidToken(format!(
                "token audience `{}` does not match project `{project_id}`",
                self.aud
            )));
        }
        let expected_issuer = format!("{ISSUER_PREFIX}{project_id}");
        if self.iss != expected_issuer {
            return Err(IdentityError::InvalidToken(format!(
                "token issuer `{}` is not `{expected_issuer}`",
                self.iss
            )));
        }
        Ok(())
    }

    pub(crate) fn expires_at(&self) -> Result<DateTime<Utc>, IdentityError> {
        timestamp(self.exp, "exp")
    }

    pub(crate) fn into_token(self) -> Result<Token, IdentityError> {
        let issued_at = timestamp(self.iat, "iat")?;
        let expires_at = timestamp(self.exp, "exp")?;
        let mut claims = self.rest;
        for name in PROVIDER_CLAIMS {
            claims.remove(name);
        }

        let mut token = Token::verified(self.sub, issued_at, expires_at)
            .with_issuer(self.iss)
            .with_audience(self.aud)
            .with_claims(claims);
        if let Some(auth_time) = self.auth_time {
            token = token.with_auth_time(timestamp(auth_time, "auth_time")?);
        }
        if let Some(provider) = self.firebase.sign_in_provider {
            token = token.with_sign_in_provider(provider);
        }
        Ok(token)
    }
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, IdentityError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| IdentityError::InvalidToken(format!("token `{claim}` is out of range")))
}

/// Builds an unsigned compact JWT around `payload`.
#[cfg(test)]
pub(crate) fn encode_unsigned(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}
