// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store trait: identifier -> opaque encrypted blob.

use async_trait::async_trait;

use crate::error::LockboxError;
use crate::types::{KdfProfile, VaultSnapshot};

/// Persistent key-value storage for encrypted credential blobs.
///
/// Blobs are opaque to the store. Implementations must make every write
/// atomic per identifier and must report medium failures as
/// [`LockboxError::Storage`], never as [`LockboxError::NotFound`].
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Insert or overwrite the blob stored under `identifier`.
    ///
    /// Fails with `InvalidInput` when `identifier` is empty.
    async fn save_password(&self, identifier: &str, blob: &[u8]) -> Result<(), LockboxError>;

    /// Fetch the blob stored under `identifier`, or `NotFound`.
    async fn get_password(&self, identifier: &str) -> Result<Vec<u8>, LockboxError>;

    /// Every stored identifier in byte order, reserved ones included.
    async fn get_all_sites(&self) -> Result<Vec<String>, LockboxError>;

    /// Remove the entry under `identifier`, or `NotFound`.
    async fn delete_password(&self, identifier: &str) -> Result<(), LockboxError>;

    /// The persisted key derivation profile, if a master password was ever set.
    async fn load_kdf_profile(&self) -> Result<Option<KdfProfile>, LockboxError>;

    /// Store `blob` under `identifier` while `profile` is still the persisted one.
    ///
    /// Fails with `Conflict` and writes nothing once the vault was rekeyed,
    /// so a blob sealed under a stale key can never land.
    async fn save_password_under(
        &self,
        profile: &KdfProfile,
        identifier: &str,
        blob: &[u8],
    ) -> Result<(), LockboxError>;

    /// Write the first `profile` together with the master `verifier`.
    ///
    /// Fails with `InvalidInput` when a profile or verifier already exists.
    async fn commit_initial(
        &self,
        profile: &KdfProfile,
        verifier: &[u8],
    ) -> Result<(), LockboxError>;

    /// Write `profile` and upsert all `entries` in a single transaction.
    ///
    /// The commit happens only if the store still holds exactly `previous`
    /// (same profile, same identifiers, same blobs); otherwise it fails with
    /// `Conflict` and nothing is written. Readers observe either the previous
    /// state or the complete new one.
    async fn commit_rekey(
        &self,
        previous: &VaultSnapshot,
        profile: &KdfProfile,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<(), LockboxError>;
}
