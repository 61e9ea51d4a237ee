// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the master password.
//!
//! Derives a 32-byte key using Argon2id (Algorithm::Argon2id, Version::V0x13)
//! with the salt and cost parameters recorded in a [`KdfProfile`].

use lockbox_config::model::VaultConfig;
use lockbox_core::{KdfParams, KdfProfile, LockboxError, SALT_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Length of the derived master key.
pub const KEY_LEN: usize = 32;

/// Derive the master key for `password` under `profile`.
///
/// The returned key is wrapped in [`Zeroizing`] and is wiped on drop.
pub fn derive_key(
    password: &[u8],
    profile: &KdfProfile,
) -> Result<Zeroizing<[u8; KEY_LEN]>, LockboxError> {
    let KdfParams {
        memory_cost,
        iterations,
        parallelism,
    } = profile.params;
    let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(KEY_LEN))
        .map_err(|e| LockboxError::Crypto(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, &profile.salt, output.as_mut())
        .map_err(|e| LockboxError::Crypto(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

/// Generate a random salt from the system CSPRNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN], LockboxError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| LockboxError::Crypto("failed to generate random salt".to_string()))?;
    Ok(salt)
}

/// A fresh profile: new random salt, cost parameters from `config`.
pub fn new_profile(config: &VaultConfig) -> Result<KdfProfile, LockboxError> {
    Ok(KdfProfile {
        salt: generate_salt()?,
        params: KdfParams {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        },
    })
}
