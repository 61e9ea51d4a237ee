// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault lifecycle: set the master password, authenticate, and manage sites.
//!
//! The master key is derived from the master password and the persisted
//! [`KdfProfile`]. The reserved `MAINPW` entry holds the master password
//! encrypted under that key; it decrypting successfully is what proves a
//! candidate password correct. Every site blob is encrypted directly under
//! the same key, so changing the master password re-encrypts every entry.

use std::collections::BTreeMap;
use std::sync::Arc;

use lockbox_config::model::{LockboxConfig, VaultConfig};
use lockbox_core::{
    is_reserved_identifier, CredentialStore, KdfProfile, LockboxError, VaultSnapshot,
    MASTER_VERIFIER_ID,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::blob::BlobDiagnosis;
use crate::generator::PasswordGenerator;
use crate::kdf;
use crate::manager::CryptoManager;

/// Locked vault: a store plus the settings used when (re)keying it.
pub struct Vault {
    store: Arc<dyn CredentialStore>,
    config: VaultConfig,
    generator: PasswordGenerator,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("config", &self.config)
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl Vault {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        config: VaultConfig,
        generator: PasswordGenerator,
    ) -> Self {
        Self {
            store,
            config,
            generator,
        }
    }

    /// Build a vault from the `[vault]` and `[generator]` config sections.
    pub fn from_config(
        store: Arc<dyn CredentialStore>,
        config: &LockboxConfig,
    ) -> Result<Self, LockboxError> {
        let generator = PasswordGenerator::from_config(&config.generator)?;
        Ok(Self::new(store, config.vault.clone(), generator))
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Whether a master password has been set.
    pub async fn is_initialized(&self) -> Result<bool, LockboxError> {
        match self.store.get_password(MASTER_VERIFIER_ID).await {
            Ok(_) => Ok(true),
            Err(LockboxError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Set the first master password and return the unlocked session.
    ///
    /// Fails with `InvalidInput` if the password is empty or one is already
    /// set. The salt, parameters and verifier are committed together, and the
    /// store refuses the commit if another caller initialized the vault first.
    pub async fn set_master_password(
        &self,
        password: &SecretString,
    ) -> Result<VaultSession, LockboxError> {
        if password.expose_secret().is_empty() {
            return Err(LockboxError::InvalidInput(
                "master password must not be empty".to_string(),
            ));
        }
        if self.is_initialized().await? {
            return Err(LockboxError::InvalidInput(
                "master password is already set".to_string(),
            ));
        }

        let profile = kdf::new_profile(&self.config)?;
        let crypto = CryptoManager::derive_blocking(copy_secret(password), profile.clone()).await?;
        let verifier = crypto.encrypt_string(password.expose_secret())?;

        self.store.commit_initial(&profile, &verifier).await?;

        info!(
            memory_cost = profile.params.memory_cost,
            iterations = profile.params.iterations,
            parallelism = profile.params.parallelism,
            "master password set"
        );
        Ok(self.session(crypto, profile))
    }

    /// Check a candidate master password.
    ///
    /// `Ok(false)` for a wrong password or an unreadable verifier,
    /// `Err(NotFound)` when no master password was ever set.
    pub async fn authenticate(&self, password: &SecretString) -> Result<bool, LockboxError> {
        Ok(self.try_unlock(password).await?.is_some())
    }

    /// Like [`authenticate`](Self::authenticate), but hands back the session.
    pub async fn unlock(&self, password: &SecretString) -> Result<VaultSession, LockboxError> {
        match self.try_unlock(password).await? {
            Some((crypto, profile)) => {
                info!("vault unlocked");
                Ok(self.session(crypto, profile))
            }
            None => Err(LockboxError::WrongPassword),
        }
    }

    async fn try_unlock(
        &self,
        password: &SecretString,
    ) -> Result<Option<(CryptoManager, KdfProfile)>, LockboxError> {
        let verifier = self.store.get_password(MASTER_VERIFIER_ID).await?;
        let profile = self.require_profile().await?;

        let crypto = CryptoManager::derive_blocking(copy_secret(password), profile.clone()).await?;
        match crypto.decrypt(&verifier) {
            Ok(_) => Ok(Some((crypto, profile))),
            Err(LockboxError::WrongPassword) => {
                warn!("master password rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn require_profile(&self) -> Result<KdfProfile, LockboxError> {
        self.store
            .load_kdf_profile()
            .await?
            .ok_or_else(|| LockboxError::storage("verifier present but kdf profile missing"))
    }

    fn session(&self, crypto: CryptoManager, profile: KdfProfile) -> VaultSession {
        VaultSession {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            generator: self.generator,
            crypto,
            profile,
        }
    }
}

/// Unlocked vault. Holds the master key until dropped or [`lock`](Self::lock)ed.
///
/// Writes are tied to the profile the key was derived from; once another
/// session rekeys the vault they fail with `Conflict`.
pub struct VaultSession {
    store: Arc<dyn CredentialStore>,
    config: VaultConfig,
    generator: PasswordGenerator,
    crypto: CryptoManager,
    profile: KdfProfile,
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("crypto", &self.crypto)
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

impl VaultSession {
    /// Every stored site identifier, without the reserved verifier entry.
    pub async fn list_site_identifiers(&self) -> Result<Vec<String>, LockboxError> {
        let mut sites = self.store.get_all_sites().await?;
        sites.retain(|id| !is_reserved_identifier(id));
        Ok(sites)
    }

    /// Generate a password for `identifier`, store it encrypted, return it.
    ///
    /// An existing entry for the identifier is overwritten.
    pub async fn add_site(&self, identifier: &str) -> Result<SecretString, LockboxError> {
        validate_site_identifier(identifier)?;

        let password = SecretString::from(self.generator.get_random_password());
        let blob = self.crypto.encrypt_string(password.expose_secret())?;
        self.store
            .save_password_under(&self.profile, identifier, &blob)
            .await?;

        debug!(identifier, "site stored");
        Ok(password)
    }

    /// Decrypt the stored password for `identifier`.
    pub async fn reveal_site_password(
        &self,
        identifier: &str,
    ) -> Result<SecretString, LockboxError> {
        validate_site_identifier(identifier)?;

        let blob = self.store.get_password(identifier).await?;
        let password = self.crypto.decrypt_string(&blob)?;
        debug!(identifier, "site revealed");
        Ok(password)
    }

    pub async fn remove_site(&self, identifier: &str) -> Result<(), LockboxError> {
        validate_site_identifier(identifier)?;
        self.store.delete_password(identifier).await?;
        debug!(identifier, "site removed");
        Ok(())
    }

    /// Re-key the vault under `new_password`.
    ///
    /// Every entry is decrypted with the current key first; if any of them
    /// fails nothing is written. The new profile, the new verifier and all
    /// re-encrypted entries are committed in one transaction, and only if no
    /// entry was added, changed or removed since they were read. Otherwise
    /// the call fails with `Conflict` and the vault keeps its old key.
    pub async fn change_master_password(
        &mut self,
        new_password: &SecretString,
    ) -> Result<(), LockboxError> {
        if new_password.expose_secret().is_empty() {
            return Err(LockboxError::InvalidInput(
                "master password must not be empty".to_string(),
            ));
        }

        let previous = self.snapshot().await?;
        let mut plaintexts = Vec::new();
        for (identifier, blob) in &previous.entries {
            if is_reserved_identifier(identifier) {
                continue;
            }
            plaintexts.push((identifier.clone(), self.crypto.decrypt(blob)?));
        }

        let profile = kdf::new_profile(&self.config)?;
        let crypto =
            CryptoManager::derive_blocking(copy_secret(new_password), profile.clone()).await?;

        let mut entries = Vec::with_capacity(plaintexts.len() + 1);
        entries.push((
            MASTER_VERIFIER_ID.to_string(),
            crypto.encrypt_string(new_password.expose_secret())?,
        ));
        for (identifier, plaintext) in &plaintexts {
            entries.push((identifier.clone(), crypto.encrypt(plaintext)?));
        }

        self.store.commit_rekey(&previous, &profile, entries).await?;
        self.crypto = crypto;
        self.profile = profile;

        info!(entries = plaintexts.len(), "master password changed");
        Ok(())
    }

    /// Classify every stored blob, the verifier included, under the session key.
    ///
    /// Entries removed while the sweep runs are left out of the report.
    pub async fn verify_integrity(&self) -> Result<Vec<(String, BlobDiagnosis)>, LockboxError> {
        let mut report = Vec::new();
        for identifier in self.store.get_all_sites().await? {
            let blob = match self.store.get_password(&identifier).await {
                Ok(blob) => blob,
                Err(LockboxError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let diagnosis = self.crypto.inspect(&blob);
            if diagnosis != BlobDiagnosis::Intact {
                warn!(identifier = %identifier, ?diagnosis, "entry failed integrity check");
            }
            report.push((identifier, diagnosis));
        }
        Ok(report)
    }

    /// Read the profile and every stored blob the session currently sees.
    async fn snapshot(&self) -> Result<VaultSnapshot, LockboxError> {
        if self.store.load_kdf_profile().await?.as_ref() != Some(&self.profile) {
            return Err(LockboxError::Conflict(
                "the master key changed since this session was unlocked".to_string(),
            ));
        }
        let mut entries = BTreeMap::new();
        for identifier in self.store.get_all_sites().await? {
            match self.store.get_password(&identifier).await {
                Ok(blob) => {
                    entries.insert(identifier, blob);
                }
                Err(LockboxError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(VaultSnapshot {
            profile: self.profile.clone(),
            entries,
        })
    }

    /// End the session. The master key is zeroized as the session drops.
    pub fn lock(self) {
        debug!("vault locked");
    }
}

fn validate_site_identifier(identifier: &str) -> Result<(), LockboxError> {
    if identifier.is_empty() {
        return Err(LockboxError::InvalidInput(
            "site identifier must not be empty".to_string(),
        ));
    }
    if is_reserved_identifier(identifier) {
        return Err(LockboxError::InvalidInput(format!(
            "{identifier} is reserved"
        )));
    }
    Ok(())
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_config::model::StorageConfig;
    use lockbox_storage::SqliteCredentialStore;
    use tempfile::TempDir;

    fn fast_config() -> VaultConfig {
        VaultConfig {
            kdf_memory_cost: 1024,
            kdf_iterations: 1,
            kdf_parallelism: 1,
        }
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    async fn open_vault() -> (Vault, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            database_path: dir.path().join("vault.db").display().to_string(),
            wal_mode: true,
        };
        let store = SqliteCredentialStore::open(&storage).await.unwrap();
        let vault = Vault::new(Arc::new(store), fast_config(), PasswordGenerator::default());
        (vault, dir)
    }

    #[tokio::test]
    async fn authenticate_before_setup_is_not_found() {
        let (vault, _dir) = open_vault().await;
        assert!(!vault.is_initialized().await.unwrap());
        assert!(matches!(
            vault.authenticate(&secret("anything")).await,
            Err(LockboxError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn set_then_authenticate() {
        let (vault, _dir) = open_vault().await;
        vault.set_master_password(&secret("Secret1!")).await.unwrap();

        assert!(vault.is_initialized().await.unwrap());
        assert!(vault.authenticate(&secret("Secret1!")).await.unwrap());
        assert!(!vault.authenticate(&secret("wrong")).await.unwrap());
    }

    #[tokio::test]
    async fn unlock_with_wrong_password_fails() {
        let (vault, _dir) = open_vault().await;
        vault.set_master_password(&secret("Secret1!")).await.unwrap();

        assert!(matches!(
            vault.unlock(&secret("wrong")).await,
            Err(LockboxError::WrongPassword)
        ));
    }

    #[tokio::test]
    async fn master_password_cannot_be_set_twice() {
        let (vault, _dir) = open_vault().await;
        vault.set_master_password(&secret("first")).await.unwrap();

        assert!(matches!(
            vault.set_master_password(&secret("second")).await,
            Err(LockboxError::InvalidInput(_))
        ));
        assert!(vault.authenticate(&secret("first")).await.unwrap());
    }

    #[tokio::test]
    async fn empty_master_password_is_rejected() {
        let (vault, _dir) = open_vault().await;
        assert!(matches!(
            vault.set_master_password(&secret("")).await,
            Err(LockboxError::InvalidInput(_))
        ));
        assert!(!vault.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn verifier_decrypts_to_the_master_password() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("Secret1!")).await.unwrap();

        let blob = vault.store().get_password(MASTER_VERIFIER_ID).await.unwrap();
        assert_eq!(
            session.crypto.decrypt_string(&blob).unwrap().expose_secret(),
            "Secret1!"
        );
    }

    #[tokio::test]
    async fn add_and_reveal_site() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("Secret1!")).await.unwrap();

        let generated = session.add_site("example.com").await.unwrap();
        assert_eq!(generated.expose_secret().len(), 12);

        let revealed = session.reveal_site_password("example.com").await.unwrap();
        assert_eq!(revealed.expose_secret(), generated.expose_secret());

        let again = session.reveal_site_password("example.com").await.unwrap();
        assert_eq!(again.expose_secret(), generated.expose_secret());
    }

    #[tokio::test]
    async fn add_site_overwrites_previous_password() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();

        session.add_site("dup.org").await.unwrap();
        let second = session.add_site("dup.org").await.unwrap();

        assert_eq!(
            session.reveal_site_password("dup.org").await.unwrap().expose_secret(),
            second.expose_secret()
        );
        assert_eq!(session.list_site_identifiers().await.unwrap(), vec!["dup.org"]);
    }

    #[tokio::test]
    async fn listing_hides_verifier() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();
        assert!(session.list_site_identifiers().await.unwrap().is_empty());

        session.add_site("b.org").await.unwrap();
        session.add_site("a.com").await.unwrap();
        assert_eq!(
            session.list_site_identifiers().await.unwrap(),
            vec!["a.com", "b.org"]
        );
    }

    #[tokio::test]
    async fn reserved_and_empty_identifiers_are_rejected() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();

        for id in ["", MASTER_VERIFIER_ID] {
            assert!(matches!(
                session.add_site(id).await,
                Err(LockboxError::InvalidInput(_))
            ));
            assert!(matches!(
                session.reveal_site_password(id).await,
                Err(LockboxError::InvalidInput(_))
            ));
            assert!(matches!(
                session.remove_site(id).await,
                Err(LockboxError::InvalidInput(_))
            ));
        }
        // Reserved matching is exact.
        session.add_site("mainpw").await.unwrap();
    }

    #[tokio::test]
    async fn reveal_missing_site_is_not_found() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();
        assert!(matches!(
            session.reveal_site_password("missing.net").await,
            Err(LockboxError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_site_deletes_entry() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();
        session.add_site("temp.io").await.unwrap();

        session.remove_site("temp.io").await.unwrap();
        assert!(session.list_site_identifiers().await.unwrap().is_empty());
        assert!(matches!(
            session.remove_site("temp.io").await,
            Err(LockboxError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn change_master_password_rekeys_everything() {
        let (vault, _dir) = open_vault().await;
        let mut session = vault.set_master_password(&secret("old")).await.unwrap();
        let original = session.add_site("example.com").await.unwrap();
        let old_profile = vault.store().load_kdf_profile().await.unwrap().unwrap();

        session.change_master_password(&secret("new")).await.unwrap();

        let new_profile = vault.store().load_kdf_profile().await.unwrap().unwrap();
        assert_ne!(old_profile.salt, new_profile.salt);
        assert!(!vault.authenticate(&secret("old")).await.unwrap());
        assert!(vault.authenticate(&secret("new")).await.unwrap());

        // The live session already uses the new key.
        assert_eq!(
            session.reveal_site_password("example.com").await.unwrap().expose_secret(),
            original.expose_secret()
        );

        let reopened = vault.unlock(&secret("new")).await.unwrap();
        assert_eq!(
            reopened.reveal_site_password("example.com").await.unwrap().expose_secret(),
            original.expose_secret()
        );
    }

    #[tokio::test]
    async fn concurrent_initialization_has_exactly_one_winner() {
        let (vault, _dir) = open_vault().await;
        let other = Vault::new(
            Arc::clone(vault.store()),
            fast_config(),
            PasswordGenerator::default(),
        );

        let alpha = secret("alpha");
        let bravo = secret("bravo");
        let (a, b) = tokio::join!(
            vault.set_master_password(&alpha),
            other.set_master_password(&bravo),
        );

        let (session, winner, loser) = match (a, b) {
            (Ok(session), Err(e)) => (session, "alpha", e),
            (Err(e), Ok(session)) => (session, "bravo", e),
            (a, b) => panic!("expected exactly one winner, got {a:?} and {b:?}"),
        };
        assert!(matches!(loser, LockboxError::InvalidInput(_)));

        let generated = session.add_site("site.com").await.unwrap();
        assert!(vault.authenticate(&secret(winner)).await.unwrap());
        let reopened = vault.unlock(&secret(winner)).await.unwrap();
        assert_eq!(
            reopened.reveal_site_password("site.com").await.unwrap().expose_secret(),
            generated.expose_secret()
        );
    }

    #[tokio::test]
    async fn stale_session_cannot_write_after_rekey() {
        let (vault, _dir) = open_vault().await;
        let mut rekeying = vault.set_master_password(&secret("old")).await.unwrap();
        let mut stale = vault.unlock(&secret("old")).await.unwrap();

        rekeying.change_master_password(&secret("new")).await.unwrap();

        assert!(matches!(
            stale.add_site("late.com").await,
            Err(LockboxError::Conflict(_))
        ));
        assert!(matches!(
            stale.change_master_password(&secret("other")).await,
            Err(LockboxError::Conflict(_))
        ));
        assert!(rekeying.list_site_identifiers().await.unwrap().is_empty());
        assert!(vault.authenticate(&secret("new")).await.unwrap());
    }

    #[tokio::test]
    async fn rekey_racing_an_insert_never_orphans_entries() {
        let (vault, _dir) = open_vault().await;
        let mut rekeying = vault.set_master_password(&secret("old")).await.unwrap();
        rekeying.add_site("early.com").await.unwrap();
        let writer = vault.unlock(&secret("old")).await.unwrap();

        let new_password = secret("new");
        let (rekeyed, added) = tokio::join!(
            rekeying.change_master_password(&new_password),
            writer.add_site("late.com"),
        );
        for result in [rekeyed.as_ref().err(), added.as_ref().err()].into_iter().flatten() {
            assert!(matches!(result, LockboxError::Conflict(_)), "{result:?}");
        }
        assert!(rekeyed.is_ok() || added.is_ok());

        let current = if rekeyed.is_ok() { "new" } else { "old" };
        let session = vault.unlock(&secret(current)).await.unwrap();
        let sites = session.list_site_identifiers().await.unwrap();
        assert_eq!(sites.contains(&"late.com".to_string()), added.is_ok());
        for site in sites {
            session.reveal_site_password(&site).await.unwrap();
        }
    }

    #[tokio::test]
    async fn change_master_password_aborts_on_unreadable_entry() {
        let (vault, _dir) = open_vault().await;
        let mut session = vault.set_master_password(&secret("old")).await.unwrap();
        vault.store().save_password("junk", b"not a blob").await.unwrap();

        assert!(matches!(
            session.change_master_password(&secret("new")).await,
            Err(LockboxError::WrongPassword)
        ));
        assert!(vault.authenticate(&secret("old")).await.unwrap());
    }

    #[tokio::test]
    async fn verify_integrity_flags_tampered_entries() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();
        session.add_site("good.com").await.unwrap();
        session.add_site("bad.com").await.unwrap();

        let mut blob = vault.store().get_password("bad.com").await.unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        vault.store().save_password("bad.com", &blob).await.unwrap();
        vault.store().save_password("short.com", &[1, 2, 3]).await.unwrap();

        let report = session.verify_integrity().await.unwrap();
        let find = |id: &str| report.iter().find(|(i, _)| i == id).map(|(_, d)| d.clone());

        assert_eq!(find(MASTER_VERIFIER_ID), Some(BlobDiagnosis::Intact));
        assert_eq!(find("good.com"), Some(BlobDiagnosis::Intact));
        assert_eq!(find("bad.com"), Some(BlobDiagnosis::AuthenticationFailed));
        assert!(matches!(find("short.com"), Some(BlobDiagnosis::Malformed { .. })));

        assert!(matches!(
            session.reveal_site_password("bad.com").await,
            Err(LockboxError::WrongPassword)
        ));
    }

    #[tokio::test]
    async fn corrupted_verifier_authenticates_false() {
        let (vault, _dir) = open_vault().await;
        vault.set_master_password(&secret("pw")).await.unwrap();
        vault
            .store()
            .save_password(MASTER_VERIFIER_ID, b"garbage")
            .await
            .unwrap();

        assert!(!vault.authenticate(&secret("pw")).await.unwrap());
    }

    #[tokio::test]
    async fn session_debug_does_not_leak_key() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("pw")).await.unwrap();
        let rendered = format!("{session:?}");
        assert!(rendered.contains("[REDACTED]"));
        session.lock();
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn logs_never_contain_secrets() {
        let (vault, _dir) = open_vault().await;
        let session = vault.set_master_password(&secret("Secret1!")).await.unwrap();
        let generated = session.add_site("example.com").await.unwrap();
        session.reveal_site_password("example.com").await.unwrap();
        let _ = vault.authenticate(&secret("wrong")).await.unwrap();

        assert!(logs_contain("master password set"));
        assert!(logs_contain("site stored"));
        assert!(logs_contain("master password rejected"));
        assert!(!logs_contain("Secret1!"));
        assert!(!logs_contain(generated.expose_secret()));
    }
}
