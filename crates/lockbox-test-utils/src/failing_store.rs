// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store that fails every call with a storage error.

use async_trait::async_trait;

use lockbox_core::{CredentialStore, KdfProfile, LockboxError, VaultSnapshot};

/// Simulates a broken persistence medium (disk gone, database locked).
///
/// Used to check that storage failures propagate as fatal `Storage` errors
/// and are never mistaken for a missing entry or a wrong password.
#[derive(Debug, Clone)]
pub struct FailingCredentialStore {
    message: String,
}

impl FailingCredentialStore {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn fail<T>(&self) -> Result<T, LockboxError> {
        Err(LockboxError::storage(self.message.clone()))
    }
}

impl Default for FailingCredentialStore {
    fn default() -> Self {
        Self::new("simulated storage failure")
    }
}

#[async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn save_password(&self, _identifier: &str, _blob: &[u8]) -> Result<(), LockboxError> {
        self.fail()
    }

    async fn get_password(&self, _identifier: &str) -> Result<Vec<u8>, LockboxError> {
        self.fail()
    }

    async fn get_all_sites(&self) -> Result<Vec<String>, LockboxError> {
        self.fail()
    }

    async fn delete_password(&self, _identifier: &str) -> Result<(), LockboxError> {
        self.fail()
    }

    async fn load_kdf_profile(&self) -> Result<Option<KdfProfile>, LockboxError> {
        self.fail()
    }

    async fn save_password_under(
        &self,
        _profile: &KdfProfile,
        _identifier: &str,
        _blob: &[u8],
    ) -> Result<(), LockboxError> {
        self.fail()
    }

    async fn commit_initial(
        &self,
        _profile: &KdfProfile,
        _verifier: &[u8],
    ) -> Result<(), LockboxError> {
        self.fail()
    }

    async fn commit_rekey(
        &self,
        _previous: &VaultSnapshot,
        _profile: &KdfProfile,
        _entries: Vec<(String, Vec<u8>)>,
    ) -> Result<(), LockboxError> {
        self.fail()
    }
}
