// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`CredentialStore`] trait.

use async_trait::async_trait;
use tracing::debug;

use lockbox_config::model::StorageConfig;
use lockbox_core::{CredentialStore, KdfProfile, LockboxError, VaultSnapshot};

use crate::database::Database;
use crate::queries;

/// SQLite-backed credential store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// Blobs are stored and returned byte-for-byte.
#[derive(Debug)]
pub struct SqliteCredentialStore {
    db: Database,
}

impl SqliteCredentialStore {
    /// Open the store described by `config`, creating the file if needed.
    pub async fn open(config: &StorageConfig) -> Result<Self, LockboxError> {
        let db = Database::open_with_config(config).await?;
        debug!(path = %config.database_path, "SQLite credential store initialized");
        Ok(Self { db })
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), LockboxError> {
        self.db.close().await
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

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn save_password(&self, identifier: &str, blob: &[u8]) -> Result<(), LockboxError> {
        require_identifier(identifier)?;
        queries::credentials::upsert(&self.db, identifier, blob).await
    }

    async fn get_password(&self, identifier: &str) -> Result<Vec<u8>, LockboxError> {
        queries::credentials::get(&self.db, identifier)
            .await?
            .ok_or_else(|| LockboxError::NotFound(identifier.to_string()))
    }

    async fn get_all_sites(&self) -> Result<Vec<String>, LockboxError> {
        queries::credentials::list_identifiers(&self.db).await
    }

    async fn delete_password(&self, identifier: &str) -> Result<(), LockboxError> {
        if queries::credentials::delete(&self.db, identifier).await? {
            Ok(())
        } else {
            Err(LockboxError::NotFound(identifier.to_string()))
        }
    }

    async fn load_kdf_profile(&self) -> Result<Option<KdfProfile>, LockboxError> {
        queries::meta::load_kdf_profile(&self.db).await
    }

    async fn save_password_under(
        &self,
        profile: &KdfProfile,
        identifier: &str,
        blob: &[u8],
    ) -> Result<(), LockboxError> {
        require_identifier(identifier)?;
        queries::meta::save_under_profile(&self.db, profile, identifier, blob).await
    }

    async fn commit_initial(
        &self,
        profile: &KdfProfile,
        verifier: &[u8],
    ) -> Result<(), LockboxError> {
        queries::meta::commit_initial(&self.db, profile, verifier).await?;
        debug!("initial profile committed");
        Ok(())
    }

    async fn commit_rekey(
        &self,
        previous: &VaultSnapshot,
        profile: &KdfProfile,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<(), LockboxError> {
        if entries.iter().any(|(identifier, _)| identifier.is_empty()) {
            return Err(LockboxError::InvalidInput(
                "identifier must not be empty".to_string(),
            ));
        }
        let count = entries.len();
        queries::meta::commit_rekey(&self.db, previous, profile, entries).await?;
        debug!(entries = count, "rekey committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_core::{KdfParams, SALT_LEN};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn config_in(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("store.db").display().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips_bytes() {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::open(&config_in(&dir)).await.unwrap();

        store.save_password("example.com", &[9, 8, 7]).await.unwrap();
        assert_eq!(store.get_password("example.com").await.unwrap(), vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn missing_identifier_is_not_found() {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::open(&config_in(&dir)).await.unwrap();

        match store.get_password("nowhere").await {
            Err(LockboxError::NotFound(id)) => assert_eq!(id, "nowhere"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_identifier_is_invalid_input() {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::open(&config_in(&dir)).await.unwrap();

        let result = store.save_password("", b"x").await;
        assert!(matches!(result, Err(LockboxError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn listing_includes_every_stored_identifier() {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::open(&config_in(&dir)).await.unwrap();

        store.save_password("MAINPW", b"v").await.unwrap();
        store.save_password("b.org", b"1").await.unwrap();
        store.save_password("a.com", b"2").await.unwrap();

        assert_eq!(
            store.get_all_sites().await.unwrap(),
            vec!["MAINPW", "a.com", "b.org"]
        );
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::open(&config_in(&dir)).await.unwrap();

        store.save_password("x", b"1").await.unwrap();
        store.delete_password("x").await.unwrap();
        assert!(matches!(
            store.delete_password("x").await,
            Err(LockboxError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let profile = KdfProfile {
            salt: [5; SALT_LEN],
            params: KdfParams {
                memory_cost: 32768,
                iterations: 2,
                parallelism: 1,
            },
        };

        let store = SqliteCredentialStore::open(&config).await.unwrap();
        store.commit_initial(&profile, b"verifier").await.unwrap();
        store
            .save_password_under(&profile, "site", b"blob")
            .await
            .unwrap();
        store.close().await.unwrap();

        let reopened = SqliteCredentialStore::open(&config).await.unwrap();
        assert_eq!(reopened.load_kdf_profile().await.unwrap(), Some(profile));
        assert_eq!(reopened.get_password("site").await.unwrap(), b"blob");
    }

    #[tokio::test]
    async fn concurrent_initialization_has_one_winner() {
        let dir = tempdir().unwrap();
        let store = SqliteCredentialStore::open(&config_in(&dir)).await.unwrap();
        let profile = |byte: u8| KdfProfile {
            salt: [byte; SALT_LEN],
            params: KdfParams {
                memory_cost: 32768,
                iterations: 2,
                parallelism: 1,
            },
        };
        let (a, b) = (profile(1), profile(2));

        let (first, second) = tokio::join!(
            store.commit_initial(&a, b"alpha"),
            store.commit_initial(&b, b"bravo"),
        );

        assert!(first.is_ok() != second.is_ok());
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(LockboxError::InvalidInput(_))));

        let stored = store.load_kdf_profile().await.unwrap().unwrap();
        let verifier = store.get_password("MAINPW").await.unwrap();
        if stored == a {
            assert_eq!(verifier, b"alpha");
        } else {
            assert_eq!(stored, b);
            assert_eq!(verifier, b"bravo");
        }
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn CredentialStore> =
            Arc::new(SqliteCredentialStore::open(&config_in(&dir)).await.unwrap());

        store.save_password("dyn", b"ok").await.unwrap();
        assert_eq!(store.get_password("dyn").await.unwrap(), b"ok");
    }
}
