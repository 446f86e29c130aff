// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-agnostic account management and token verification.
//!
//! [`IdentityService`] reduces a [`User`](idbridge_core::User) to a minimal
//! patch, executes it against an injected
//! [`IdentityBackend`](idbridge_core::IdentityBackend), merges custom claims
//! in a follow-up call, and verifies bearer tokens behind a short-lived
//! single-flight [`TokenCache`].

pub mod cache;
mod cancel;
pub mod claims;
pub mod patch;
pub mod service;

pub use cache::TokenCache;
pub use claims::merge_claims;
pub use patch::build_patch;
pub use service::IdentityService;
pub use tokio_util::sync::CancellationToken;
