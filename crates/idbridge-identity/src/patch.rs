// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reduces a [`User`] to the fields the caller intends to set.

use idbridge_core::{IdentityError, Patch, User};
use secrecy::{ExposeSecret, SecretString};

/// Builds the minimal patch for `user`.
///
/// A field is included iff it differs from its zero value. `uid` is a lookup
/// key and `custom_claims` travel through a separate call, so neither is
/// part of the patch. Formats are not checked here; the backend is the
/// source of truth for validation.
pub fn build_patch(user: &User) -> Patch {
    Patch {
        email: non_empty(&user.email),
        email_verified: user.email_verified.then_some(true),
        phone_number: non_empty(&user.phone_number),
        display_name: non_empty(&user.display_name),
        photo_url: non_empty(&user.photo_url),
        disabled: user.disabled.then_some(true),
        // An empty password leaves the stored one untouched.
        password: user
            .password
            .as_ref()
            .map(|p| p.expose_secret())
            .filter(|p| !p.is_empty())
            .map(|p| SecretString::from(p.to_owned())),
        whatsapp_number: non_empty(&user.whatsapp_number),
    }
}

/// Rejects a create patch that carries neither an email nor a phone number.
pub fn require_identifier(patch: &Patch) -> Result<(), IdentityError> {
    if patch.has_identifier() {
        Ok(())
    } else {
        Err(IdentityError::Validation(
            "an email or phone number is required to create an account".to_string(),
        ))
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}
