// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-key holder combining key derivation with blob encryption.

use lockbox_core::{KdfProfile, LockboxError};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::blob::{BlobDiagnosis, EncryptedBlob};
use crate::crypto;
use crate::kdf::{self, KEY_LEN};

/// Owns one derived master key and encrypts/decrypts blobs with it.
///
/// Performs no I/O. Debug output omits the key.
pub struct CryptoManager {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CryptoManager {
    /// Wrap an already derived key.
    pub fn from_key(key: Zeroizing<[u8; KEY_LEN]>) -> Self {
        Self { key }
    }

    /// Derive the key for `password` under `profile` on the current thread.
    pub fn derive(password: &SecretString, profile: &KdfProfile) -> Result<Self, LockboxError> {
        let key = kdf::derive_key(password.expose_secret().as_bytes(), profile)?;
        Ok(Self { key })
    }

    /// [`derive`](Self::derive) on the blocking thread pool.
    ///
    /// Argon2id is memory-hard and takes long enough to stall the runtime.
    pub async fn derive_blocking(
        password: SecretString,
        profile: KdfProfile,
    ) -> Result<Self, LockboxError> {
        tokio::task::spawn_blocking(move || Self::derive(&password, &profile))
            .await
            .map_err(|e| LockboxError::Internal(format!("key derivation task failed: {e}")))?
    }

    /// Encrypt `plaintext` into serialized blob bytes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, LockboxError> {
        Ok(crypto::seal(&self.key, plaintext)?.to_bytes())
    }

    /// Decrypt serialized blob bytes.
    ///
    /// Malformed input and a failed tag check are both
    /// [`LockboxError::WrongPassword`].
    pub fn decrypt(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, LockboxError> {
        let parsed = EncryptedBlob::from_bytes(blob).map_err(|_| LockboxError::WrongPassword)?;
        crypto::open(&self.key, &parsed).map(Zeroizing::new)
    }

    pub fn encrypt_string(&self, plaintext: &str) -> Result<Vec<u8>, LockboxError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt to a UTF-8 secret. Non-UTF-8 plaintext is `WrongPassword`.
    pub fn decrypt_string(&self, blob: &[u8]) -> Result<SecretString, LockboxError> {
        let plaintext = self.decrypt(blob)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| LockboxError::WrongPassword)?;
        Ok(SecretString::from(text.to_owned()))
    }

    /// Classify `blob` without returning its plaintext.
    pub fn inspect(&self, blob: &[u8]) -> BlobDiagnosis {
        match EncryptedBlob::from_bytes(blob) {
            Err(e) => BlobDiagnosis::Malformed {
                reason: e.to_string(),
            },
            Ok(parsed) => match crypto::open(&self.key, &parsed).map(Zeroizing::new) {
                Ok(_) => BlobDiagnosis::Intact,
                Err(_) => BlobDiagnosis::AuthenticationFailed,
            },
        }
    }
}
