// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for idbridge.
//!
//! Provides the account and token data model, the error taxonomy, and the
//! [`IdentityBackend`] port that concrete identity providers implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{IdentityError, LookupBy};
pub use traits::{IdentityBackend, PluginAdapter};
pub use types::{Claims, HealthStatus, Patch, PatchField, Token, User, UserRecord};
