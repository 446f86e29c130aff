// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for idbridge.
//!
//! Provides an in-process identity backend for fast, deterministic tests
//! without a remote identity provider.
//!
//! # Components
//!
//! - [`MemoryBackend`] - account store and token issuer with call recording
//! - [`claims`] - builds a claims map from a JSON object literal

pub mod memory_backend;

pub use memory_backend::{BackendCall, MemoryBackend};

use idbridge_core::Claims;

/// Converts a `serde_json::json!({...})` object into [`Claims`].
///
/// # Panics
///
/// Panics if `value` is not a JSON object.
pub fn claims(value: serde_json::Value) -> Claims {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("claims must be a JSON object, got {other}"),
    }
}
