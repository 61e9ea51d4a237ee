// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use lockbox_core::LockboxError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::blob::{EncryptedBlob, NONCE_LEN};
use crate::kdf::KEY_LEN;

fn cipher(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, LockboxError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| LockboxError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` with a random nonce and empty AAD.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<EncryptedBlob, LockboxError> {
    let cipher = cipher(key)?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| LockboxError::Crypto("failed to generate random nonce".to_string()))?;

    // The buffer is extended in place with the authentication tag.
    let mut in_out = plaintext.to_vec();
    cipher
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| LockboxError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok(EncryptedBlob::new(nonce_bytes, in_out))
}

/// Decrypt and authenticate `blob` under `key`.
///
/// A tag mismatch is [`LockboxError::WrongPassword`]: a wrong key and a
/// modified blob look the same.
pub fn open(key: &[u8; KEY_LEN], blob: &EncryptedBlob) -> Result<Vec<u8>, LockboxError> {
    let cipher = cipher(key)?;

    let mut in_out = blob.sealed().to_vec();
    let plaintext = cipher
        .open_in_place(
            Nonce::assume_unique_for_key(*blob.nonce()),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| LockboxError::WrongPassword)?;

    Ok(plaintext.to_vec())
}
