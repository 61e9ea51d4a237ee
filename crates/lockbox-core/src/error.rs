// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Lockbox credential vault.

use thiserror::Error;

/// The primary error type shared by the store, the cipher engine, and the vault.
///
/// `WrongPassword` deliberately covers both a wrong master password and a
/// tampered or corrupted blob. Its message never says which one happened.
#[derive(Debug, Error)]
pub enum LockboxError {
    /// Authentication tag mismatch or undecodable blob.
    #[error("wrong master password or unreadable entry")]
    WrongPassword,

    /// The identifier is not present in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The persistence medium failed below the encrypted-blob layer.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Another writer changed the vault key or its entries first.
    ///
    /// Nothing was written; unlock again and retry.
    #[error("vault changed concurrently: {0}")]
    Conflict(String),

    /// Rejected argument (empty identifier, zero length, reserved name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors (invalid values, unreadable files).
    #[error("configuration error: {0}")]
    Config(String),

    /// Cipher setup or system RNG failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LockboxError {
    /// Build a `Storage` error from a plain message.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            source: message.into().into(),
        }
    }

    /// Whether the caller is expected to handle this error and carry on.
    ///
    /// Storage, crypto, config and internal failures are fatal: the vault
    /// cannot guarantee durability or confidentiality once they occur.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WrongPassword | Self::NotFound(_) | Self::InvalidInput(_) | Self::Conflict(_)
        )
    }
}
