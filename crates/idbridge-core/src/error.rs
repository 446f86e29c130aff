// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy shared by the identity service and every backend.

use strum::Display;
use thiserror::Error;

use crate::types::UserRecord;

/// The attribute a failed lookup was keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LookupBy {
    #[strum(serialize = "email")]
    Email,
    #[strum(serialize = "phone number")]
    Phone,
    #[strum(serialize = "uid")]
    Uid,
}

/// The error type returned by every identity operation.
///
/// Backend failures are surfaced unmodified in kind. The type is `Clone`
/// so concurrent token verifications can share a single failed result.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// Lookup, update, delete or claims target does not exist.
    #[error("no user with {by} `{key}`")]
    NotFound { by: LookupBy, key: String },

    /// A field was rejected by the backend (or a create carried no identifier).
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique identifier (email, phone number) is already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The bearer token is malformed, revoked, or carries a bad signature.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The bearer token was well-formed but is past its expiry.
    #[error("token expired")]
    ExpiredToken,

    /// The primary create/update succeeded but the follow-up claims call failed.
    ///
    /// The written record is carried along; nothing was rolled back.
    #[error("user `{}` was written but setting custom claims failed: {source}", .record.uid)]
    ClaimsSet {
        record: Box<UserRecord>,
        source: Box<IdentityError>,
    },

    /// The caller cancelled the operation or its deadline elapsed.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Transport failure or an unexpected backend response.
    #[error("backend error: {0}")]
    Backend(String),

    /// A backend could not be constructed.
    #[error("initialization error: {0}")]
    Init(String),

    /// Invalid configuration handed to a constructor.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IdentityError {
    /// Shorthand for a [`IdentityError::NotFound`] keyed on a uid.
    pub fn uid_not_found(uid: impl Into<String>) -> Self {
        Self::NotFound {
            by: LookupBy::Uid,
            key: uid.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for the two token verification failures.
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::InvalidToken(_) | Self::ExpiredToken)
    }
}
