// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential store for deterministic testing.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use lockbox_core::{
    CredentialStore, KdfProfile, LockboxError, VaultSnapshot, MASTER_VERIFIER_ID,
};

#[derive(Default)]
struct State {
    entries: BTreeMap<String, Vec<u8>>,
    profile: Option<KdfProfile>,
    vanishing: BTreeSet<String>,
}

/// A [`CredentialStore`] backed by a `BTreeMap`.
///
/// Listing order matches the SQLite store (byte order). Guarded writes check
/// their precondition and apply under one lock, like the SQLite transactions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<State>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, the verifier included.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// List `identifier` without ever returning a blob for it, as if it were
    /// deleted between `get_all_sites` and `get_password`.
    pub async fn add_vanishing(&self, identifier: &str) {
        self.state
            .lock()
            .await
            .vanishing
            .insert(identifier.to_string());
    }

    /// Overwrite a raw blob, bypassing validation. For corruption tests.
    pub async fn put_raw(&self, identifier: &str, blob: Vec<u8>) {
        self.state
            .lock()
            .await
            .entries
            .insert(identifier.to_string(), blob);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save_password(&self, identifier: &str, blob: &[u8]) -> Result<(), LockboxError> {
        require_identifier(identifier)?;
        self.put_raw(identifier, blob.to_vec()).await;
        Ok(())
    }

    async fn get_password(&self, identifier: &str) -> Result<Vec<u8>, LockboxError> {
        self.state
            .lock()
            .await
            .entries
            .get(identifier)
            .cloned()
            .ok_or_else(|| LockboxError::NotFound(identifier.to_string()))
    }

    async fn get_all_sites(&self) -> Result<Vec<String>, LockboxError> {
        let state = self.state.lock().await;
        let listed: BTreeSet<&String> = state.entries.keys().chain(&state.vanishing).collect();
        Ok(listed.into_iter().cloned().collect())
    }

    async fn delete_password(&self, identifier: &str) -> Result<(), LockboxError> {
        self.state
            .lock()
            .await
            .entries
            .remove(identifier)
            .map(|_| ())
            .ok_or_else(|| LockboxError::NotFound(identifier.to_string()))
    }

    async fn load_kdf_profile(&self) -> Result<Option<KdfProfile>, LockboxError> {
        Ok(self.state.lock().await.profile.clone())
    }

    async fn save_password_under(
        &self,
        profile: &KdfProfile,
        identifier: &str,
        blob: &[u8],
    ) -> Result<(), LockboxError> {
        require_identifier(identifier)?;
        let mut state = self.state.lock().await;
        if state.profile.as_ref() != Some(profile) {
            return Err(LockboxError::Conflict(
                "the master key changed since this session was unlocked".to_string(),
            ));
        }
        state.entries.insert(identifier.to_string(), blob.to_vec());
        Ok(())
    }

    async fn commit_initial(
        &self,
        profile: &KdfProfile,
        verifier: &[u8],
    ) -> Result<(), LockboxError> {
        let mut state = self.state.lock().await;
        if state.profile.is_some() || state.entries.contains_key(MASTER_VERIFIER_ID) {
            return Err(LockboxError::InvalidInput(
                "master password is already set".to_string(),
            ));
        }
        state.profile = Some(profile.clone());
        state
            .entries
            .insert(MASTER_VERIFIER_ID.to_string(), verifier.to_vec());
        Ok(())
    }

    async fn commit_rekey(
        &self,
        previous: &VaultSnapshot,
        profile: &KdfProfile,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<(), LockboxError> {
        for (identifier, _) in &entries {
            require_identifier(identifier)?;
        }
        let mut state = self.state.lock().await;
        let unchanged =
            state.profile.as_ref() == Some(&previous.profile) && state.entries == previous.entries;
        if !unchanged {
            return Err(LockboxError::Conflict(
                "entries or master key changed while re-encrypting".to_string(),
            ));
        }
        state.profile = Some(profile.clone());
        state.entries.extend(entries);
        Ok(())
    }
}

fn require_identifier(identifier: &str) -> Result<(), LockboxError> {
    if identifier.is_empty() {
        return Err(LockboxError::InvalidInput(
            "identifier must not be empty".to_string(),
        ));
    }
    Ok(())
}
