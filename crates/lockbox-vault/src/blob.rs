// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-describing ciphertext container.
//!
//! Byte layout: `version (1) || nonce (12) || ciphertext || GCM tag (16)`.
//! The store never looks inside; only this module knows the layout.

use thiserror::Error;

/// Current container format version.
pub const BLOB_VERSION: u8 = 0x01;
/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;
/// Shortest valid blob: header plus tag over an empty plaintext.
pub const MIN_BLOB_LEN: usize = 1 + NONCE_LEN + TAG_LEN;

/// Parsed form of an encrypted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    nonce: [u8; NONCE_LEN],
    /// Ciphertext with the authentication tag appended.
    sealed: Vec<u8>,
}

/// Structural problems found while parsing a blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobFormatError {
    #[error("blob is {len} bytes, shorter than the minimum of {MIN_BLOB_LEN}")]
    TooShort { len: usize },

    #[error("unsupported blob version {0:#04x}")]
    UnsupportedVersion(u8),
}

/// Outcome of the diagnostic integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobDiagnosis {
    /// Parses and authenticates under the session key.
    Intact,
    /// Cannot be parsed at all.
    Malformed { reason: String },
    /// Parses, but the tag does not verify (wrong key or tampering).
    AuthenticationFailed,
}

impl EncryptedBlob {
    pub fn new(nonce: [u8; NONCE_LEN], sealed: Vec<u8>) -> Self {
        Self { nonce, sealed }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn sealed(&self) -> &[u8] {
        &self.sealed
    }

    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + NONCE_LEN + self.sealed.len());
        out.push(BLOB_VERSION);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sealed);
        out
    }

    /// Parse the on-disk layout. Does not authenticate anything.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlobFormatError> {
        if bytes.len() < MIN_BLOB_LEN {
            return Err(BlobFormatError::TooShort { len: bytes.len() });
        }
        if bytes[0] != BLOB_VERSION {
            return Err(BlobFormatError::UnsupportedVersion(bytes[0]));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[1..=NONCE_LEN]);
        Ok(Self {
            nonce,
            sealed: bytes[1 + NONCE_LEN..].to_vec(),
        })
    }
}
