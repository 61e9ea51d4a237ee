// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: file preparation, PRAGMAs, migrations.
//!
//! All reads and writes go through one `tokio_rusqlite::Connection`, whose
//! background thread runs closures one at a time. Do NOT open additional
//! connections for writes.

use std::path::{Path, PathBuf};

use lockbox_config::model::StorageConfig;
use lockbox_core::LockboxError;
use tracing::debug;

use crate::migrations;

/// Handle to the vault database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LockboxError> {
        Self::open_with(path.as_ref().to_path_buf(), true).await
    }

    /// Open the database described by a [`StorageConfig`].
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, LockboxError> {
        Self::open_with(PathBuf::from(&config.database_path), config.wal_mode).await
    }

    async fn open_with(path: PathBuf, wal_mode: bool) -> Result<Self, LockboxError> {
        // Schema work happens on a plain blocking connection before the
        // async connection thread is started.
        let prepare_path = path.clone();
        tokio::task::spawn_blocking(move || prepare_database_file(&prepare_path, wal_mode))
            .await
            .map_err(|e| LockboxError::Internal(format!("database setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| LockboxError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = FULL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path.display(), wal_mode, "database opened");
        Ok(Self { conn, path })
    }

    /// The shared async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), LockboxError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), LockboxError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Create parent directories, set the journal mode, run migrations and
/// restrict file permissions.
fn prepare_database_file(path: &Path, wal_mode: bool) -> Result<(), LockboxError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| LockboxError::Storage {
            source: Box::new(e),
        })?;
        restrict_permissions(parent, 0o700)?;
    }

    let mut conn = rusqlite::Connection::open(path).map_err(|e| LockboxError::Storage {
        source: Box::new(e),
    })?;

    let journal = if wal_mode { "WAL" } else { "DELETE" };
    conn.execute_batch(&format!("PRAGMA journal_mode = {journal};"))
        .map_err(|e| LockboxError::Storage {
            source: Box::new(e),
        })?;

    migrations::run_migrations(&mut conn)?;
    drop(conn);

    restrict_permissions(path, 0o600)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<(), LockboxError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        LockboxError::Storage {
            source: Box::new(e),
        }
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<(), LockboxError> {
    Ok(())
}

/// Convert tokio-rusqlite errors to `LockboxError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LockboxError {
    LockboxError::Storage {
        source: Box::new(e),
    }
}
