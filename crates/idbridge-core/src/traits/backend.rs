// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capability set a concrete identity provider must offer.

use async_trait::async_trait;

use crate::error::IdentityError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Claims, Patch, Token, UserRecord};

/// Port to the external service of record for accounts and tokens.
///
/// Implementations translate these calls into provider requests and map
/// provider failures onto [`IdentityError`] kinds. They never retry on
/// behalf of the caller and never leak provider SDK types.
#[async_trait]
pub trait IdentityBackend: PluginAdapter {
    /// Looks up an account by email. Fails with `NotFound`.
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, IdentityError>;

    /// Looks up an account by phone number. Fails with `NotFound`.
    async fn find_by_phone(&self, phone: &str) -> Result<UserRecord, IdentityError>;

    /// Creates an account from the patch. Fails with `Validation` or `Conflict`.
    async fn create(&self, patch: &Patch) -> Result<UserRecord, IdentityError>;

    /// Applies the patch to an existing account. Fails with `NotFound` or `Validation`.
    async fn update(&self, uid: &str, patch: &Patch) -> Result<UserRecord, IdentityError>;

    /// Deletes an account. Fails with `NotFound`.
    async fn delete(&self, uid: &str) -> Result<(), IdentityError>;

    /// Replaces the account's custom claims wholesale. Fails with `NotFound`.
    async fn set_claims(&self, uid: &str, claims: &Claims) -> Result<(), IdentityError>;

    /// Verifies a raw bearer token. Fails with `InvalidToken` or `ExpiredToken`.
    async fn verify_token(&self, raw_token: &str) -> Result<Token, IdentityError>;
}
