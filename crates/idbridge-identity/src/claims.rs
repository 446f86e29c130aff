// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Custom claims merging.
//!
//! Backends replace the whole claims object on every set, so incoming claims
//! are merged over the stored ones before they are sent.

use idbridge_core::Claims;

/// Incoming keys overwrite existing keys of the same name; keys present only
/// in `existing` are preserved.
pub fn merge_claims(existing: &Claims, incoming: &Claims) -> Claims {
    let mut merged = existing.clone();
    for (key, value) in incoming {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
