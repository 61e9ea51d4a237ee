// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lockbox backup` and `lockbox restore` command implementation.
//!
//! Uses rusqlite's Backup API for consistent copies that work even while
//! the database is open in WAL mode. Blobs stay encrypted in the copy; the
//! KDF profile travels with them, so a backup unlocks with the master
//! password that was current when it was taken.

use std::path::Path;
use std::time::Duration;

use lockbox_core::LockboxError;
use rusqlite::{Connection, OpenFlags};
use tracing::info;

const PAGES_PER_STEP: std::os::raw::c_int = 100;
const STEP_PAUSE: Duration = Duration::from_millis(10);

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> LockboxError {
    LockboxError::Storage {
        source: Box::new(e),
    }
}

fn missing(what: &str, path: &Path) -> LockboxError {
    storage_err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{what} not found: {}", path.display()),
    ))
}

fn copy_database(src: &Connection, dst_path: &Path) -> Result<u64, LockboxError> {
    let mut dst = Connection::open(dst_path).map_err(storage_err)?;
    rusqlite::backup::Backup::new(src, &mut dst)
        .map_err(storage_err)?
        .run_to_completion(PAGES_PER_STEP, STEP_PAUSE, None)
        .map_err(storage_err)?;
    drop(dst);

    restrict_permissions(dst_path)?;
    Ok(std::fs::metadata(dst_path).map_err(storage_err)?.len())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), LockboxError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(storage_err)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), LockboxError> {
    Ok(())
}

/// Copy the vault database at `db_path` to `backup_path`.
///
/// Returns the size of the written file in bytes.
pub fn run_backup(db_path: &Path, backup_path: &Path) -> Result<u64, LockboxError> {
    if !db_path.exists() {
        return Err(missing("database", db_path));
    }

    let src = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(storage_err)?;

    let size = copy_database(&src, backup_path)?;
    info!(from = %db_path.display(), to = %backup_path.display(), size, "backup complete");
    Ok(size)
}

/// Replace the vault database at `db_path` with the contents of `restore_from`.
///
/// The source must be a readable SQLite database containing a credentials
/// table. An existing database is first copied to `<db_path>.pre-restore`.
pub fn run_restore(db_path: &Path, restore_from: &Path) -> Result<u64, LockboxError> {
    if !restore_from.exists() {
        return Err(missing("backup file", restore_from));
    }

    let src = Connection::open_with_flags(restore_from, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(storage_err)?;
    src.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get::<_, i64>(0))
        .map_err(storage_err)?;

    if db_path.exists() {
        let mut safety = db_path.as_os_str().to_owned();
        safety.push(".pre-restore");
        run_backup(db_path, Path::new(&safety))?;
    }

    let size = copy_database(&src, db_path)?;
    info!(from = %restore_from.display(), to = %db_path.display(), size, "restore complete");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_storage::SqliteCredentialStore;
    use lockbox_config::model::StorageConfig;
    use lockbox_core::CredentialStore;

    async fn seeded_database(path: &Path, id: &str) {
        let config = StorageConfig {
            database_path: path.display().to_string(),
            wal_mode: true,
        };
        let store = SqliteCredentialStore::open(&config).await.unwrap();
        store.save_password(id, b"blob").await.unwrap();
        store.close().await.unwrap();
    }

    fn identifiers(path: &Path) -> Vec<String> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn
            .prepare("SELECT identifier FROM credentials ORDER BY identifier")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn backup_nonexistent_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_backup(&dir.path().join("absent.db"), &dir.path().join("out.db"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("not found"));
    }

    #[test]
    fn restore_nonexistent_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_restore(&dir.path().join("target.db"), &dir.path().join("absent.db"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn backup_copies_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("vault.db");
        let copy = dir.path().join("copy.db");
        seeded_database(&db, "example.com").await;

        let size = run_backup(&db, &copy).unwrap();
        assert!(size > 0);
        assert_eq!(identifiers(&copy), vec!["example.com"]);
    }

    #[tokio::test]
    async fn restore_keeps_pre_restore_copy() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.db");
        let backup = dir.path().join("backup.db");
        seeded_database(&current, "current.org").await;
        seeded_database(&backup, "restored.org").await;

        run_restore(&current, &backup).unwrap();

        assert_eq!(identifiers(&current), vec!["restored.org"]);
        let safety = dir.path().join("current.db.pre-restore");
        assert_eq!(identifiers(&safety), vec!["current.org"]);
    }

    #[test]
    fn restore_rejects_non_vault_file() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.db");
        std::fs::write(&bogus, b"this is not a sqlite file").unwrap();

        assert!(run_restore(&dir.path().join("target.db"), &bogus).is_err());
    }

    #[test]
    fn restore_rejects_database_without_credentials_table() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.db");
        Connection::open(&other)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (id INTEGER PRIMARY KEY);")
            .unwrap();

        assert!(run_restore(&dir.path().join("target.db"), &other).is_err());
    }
}
