// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end vault testing.
//!
//! `TestHarness` assembles a [`Vault`] over either the in-memory store or a
//! temp SQLite database, with KDF costs low enough for fast tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lockbox_config::model::{StorageConfig, VaultConfig};
use lockbox_core::{CredentialStore, LockboxError};
use lockbox_storage::SqliteCredentialStore;
use lockbox_vault::{PasswordGenerator, Vault, VaultSession};
use secrecy::SecretString;

use crate::memory_store::MemoryCredentialStore;

/// Argon2id costs far below the production minimums. Tests only.
pub fn fast_vault_config() -> VaultConfig {
    VaultConfig {
        kdf_memory_cost: 1024,
        kdf_iterations: 1,
        kdf_parallelism: 1,
    }
}

enum Backend {
    Memory,
    Sqlite,
    Custom(Arc<dyn CredentialStore>),
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: Backend,
    generator_length: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: Backend::Memory,
            generator_length: 12,
        }
    }

    /// Back the vault with a temp SQLite database instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.backend = Backend::Sqlite;
        self
    }

    /// Back the vault with a caller-supplied store.
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.backend = Backend::Custom(store);
        self
    }

    /// Set the generated password length.
    pub fn with_generator_length(mut self, length: usize) -> Self {
        self.generator_length = length;
        self
    }

    pub async fn build(self) -> Result<TestHarness, LockboxError> {
        let generator = PasswordGenerator::new(self.generator_length)?;

        let mut temp_dir = None;
        let store: Arc<dyn CredentialStore> = match self.backend {
            Backend::Memory => Arc::new(MemoryCredentialStore::new()),
            Backend::Custom(store) => store,
            Backend::Sqlite => {
                let dir = tempfile::TempDir::new()
                    .map_err(|e| LockboxError::Storage { source: e.into() })?;
                let store = SqliteCredentialStore::open(&storage_config(dir.path())).await?;
                temp_dir = Some(dir);
                Arc::new(store)
            }
        };

        let vault = Vault::new(Arc::clone(&store), fast_vault_config(), generator);
        Ok(TestHarness {
            vault,
            store,
            generator,
            temp_dir,
        })
    }
}

fn storage_config(dir: &Path) -> StorageConfig {
    StorageConfig {
        database_path: dir.join("test.db").display().to_string(),
        wal_mode: true,
    }
}

/// A vault plus direct access to its store for assertions.
pub struct TestHarness {
    /// The vault under test.
    pub vault: Vault,
    /// The same store the vault uses, for inspecting or corrupting blobs.
    pub store: Arc<dyn CredentialStore>,
    generator: PasswordGenerator,
    /// Temp directory kept alive for cleanup on drop (SQLite only).
    temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Set `password` as the master password and return the session.
    pub async fn initialized(&self, password: &str) -> Result<VaultSession, LockboxError> {
        self.vault.set_master_password(&secret(password)).await
    }

    /// Path of the SQLite database, if this harness uses one.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("test.db"))
    }

    /// A second vault over a freshly opened connection to the same database,
    /// as a new process would see it.
    pub async fn reopen(&self) -> Result<Vault, LockboxError> {
        let Some(dir) = self.temp_dir.as_ref() else {
            return Err(LockboxError::InvalidInput(
                "only SQLite harnesses can be reopened".to_string(),
            ));
        };
        let store = SqliteCredentialStore::open(&storage_config(dir.path())).await?;
        Ok(Vault::new(
            Arc::new(store),
            fast_vault_config(),
            self.generator,
        ))
    }
}

/// Shorthand for building a [`SecretString`] in tests.
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}
