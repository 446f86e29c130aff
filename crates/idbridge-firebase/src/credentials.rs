// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth access tokens for authenticating provider requests.
//!
//! Minting tokens from a service account is left to the embedding
//! application; it hands the backend an [`AccessTokenSource`].

use async_trait::async_trait;
use idbridge_core::IdentityError;
use secrecy::{ExposeSecret, SecretString};

/// Supplies a bearer access token for each provider request.
#[async_trait]
pub trait AccessTokenSource: Send + Sync + 'static {
    async fn access_token(&self) -> Result<SecretString, IdentityError>;
}

/// A fixed access token.
pub struct StaticAccessToken {
    token: SecretString,
}

impl StaticAccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    /// The token the Firebase Auth emulator accepts for admin calls.
    pub fn emulator() -> Self {
        Self::new("owner")
    }
}

impl std::fmt::Debug for StaticAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAccessToken")
            .field("token", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl AccessTokenSource for StaticAccessToken {
    async fn access_token(&self) -> Result<SecretString, IdentityError> {
        Ok(SecretString::from(self.token.expose_secret().to_owned()))
    }
}
