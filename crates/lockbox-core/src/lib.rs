// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Lockbox credential vault.
//!
//! This crate provides the error type, the shared types and the
//! [`CredentialStore`] trait that the SQLite store and the vault engine meet at.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LockboxError;
pub use traits::CredentialStore;
pub use types::{
    is_reserved_identifier, KdfParams, KdfProfile, VaultSnapshot, MASTER_VERIFIER_ID, SALT_LEN,
};
