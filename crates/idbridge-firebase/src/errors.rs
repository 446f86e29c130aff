// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps Identity Toolkit failures onto [`IdentityError`] kinds.

use idbridge_core::{IdentityError, LookupBy};

/// What a request was about, so `*_NOT_FOUND` can name the missing key.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Subject<'a> {
    Email(&'a str),
    Phone(&'a str),
    Uid(&'a str),
    Token,
}

impl Subject<'_> {
    pub(crate) fn not_found(self) -> IdentityError {
        let (by, key) = match self {
            Subject::Email(key) => (LookupBy::Email, key),
            Subject::Phone(key) => (LookupBy::Phone, key),
            Subject::Uid(key) => (LookupBy::Uid, key),
            Subject::Token => {
                return IdentityError::InvalidToken("token subject no longer exists".to_string());
            }
        };
        IdentityError::NotFound {
            by,
            key: key.to_owned(),
        }
    }
}

/// A failed provider call, before it is given meaning.
#[derive(Debug)]
pub(crate) enum ApiFailure {
    /// No access token could be obtained.
    Credentials(IdentityError),
    /// The request never produced an HTTP response.
    Transport(String),
    /// A successful response whose body could not be read.
    Decode(String),
    /// The provider answered with an error envelope or an unreadable body.
    Provider {
        status: u16,
        reason: String,
        detail: Option<String>,
    },
}

impl ApiFailure {
    /// Splits a provider message such as `WEAK_PASSWORD : Password should be
    /// at least 6 characters` into its reason code and detail.
    pub(crate) fn from_message(status: u16, message: &str) -> Self {
        let (reason, detail) = match message.split_once(':') {
            Some((reason, detail)) => (reason.trim(), Some(detail.trim().to_owned())),
            None => (message.trim(), None),
        };
        Self::Provider {
            status,
            reason: reason.to_owned(),
            detail: detail.filter(|d| !d.is_empty()),
        }
    }

    pub(crate) fn into_identity(self, subject: Subject<'_>) -> IdentityError {
        let (status, reason, detail) = match self {
            ApiFailure::Credentials(err) => return err,
            ApiFailure::Transport(message) | ApiFailure::Decode(message) => {
                return IdentityError::Backend(message);
            }
            ApiFailure::Provider {
                status,
                reason,
                detail,
            } => (status, reason, detail),
        };
        let describe = || match &detail {
            Some(d) => format!("{reason}: {d}"),
            None => reason.clone(),
        };

        match reason.as_str() {
            "USER_NOT_FOUND" | "EMAIL_NOT_FOUND" => subject.not_found(),
            "EMAIL_EXISTS" | "PHONE_NUMBER_EXISTS" | "DUPLICATE_LOCAL_ID" | "DUPLICATE_EMAIL"
            | "DUPLICATE_RAW_ID" => IdentityError::Conflict(describe()),
            "TOKEN_EXPIRED" => IdentityError::ExpiredToken,
            "INVALID_ID_TOKEN" | "USER_DISABLED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
                IdentityError::InvalidToken(describe())
            }
            "WEAK_PASSWORD" | "CLAIMS_TOO_LARGE" | "FORBIDDEN_CLAIM" => {
                IdentityError::Validation(describe())
            }
            r if r.starts_with("INVALID_") || r.starts_with("MISSING_") => {
                IdentityError::Validation(describe())
            }
            _ => IdentityError::Backend(format!("provider returned {status}: {}", describe())),
        }
    }
}
