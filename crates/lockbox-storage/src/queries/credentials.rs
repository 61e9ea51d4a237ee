// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential row operations.

use lockbox_core::LockboxError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};

pub(crate) const UPSERT_SQL: &str = "INSERT INTO credentials (identifier, blob, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(identifier) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at";

/// Insert or replace the blob for `identifier` in one statement.
pub async fn upsert(db: &Database, identifier: &str, blob: &[u8]) -> Result<(), LockboxError> {
    let identifier = identifier.to_string();
    let blob = blob.to_vec();
    let now = chrono::Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(UPSERT_SQL, params![identifier, blob, now])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the blob for `identifier`, `None` when absent.
pub async fn get(db: &Database, identifier: &str) -> Result<Option<Vec<u8>>, LockboxError> {
    let identifier = identifier.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT blob FROM credentials WHERE identifier = ?1",
                params![identifier],
                |row| row.get::<_, Vec<u8>>(0),
            );
            match result {
                Ok(blob) => Ok(Some(blob)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All identifiers in byte order (SQLite BINARY collation).
pub async fn list_identifiers(db: &Database) -> Result<Vec<String>, LockboxError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT identifier FROM credentials ORDER BY identifier")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete the row for `identifier`. Returns whether a row existed.
pub async fn delete(db: &Database, identifier: &str) -> Result<bool, LockboxError> {
    let identifier = identifier.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "DELETE FROM credentials WHERE identifier = ?1",
                params![identifier],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
