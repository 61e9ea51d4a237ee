// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key derivation profile persistence and the guarded write transactions.
//!
//! Every write that depends on the current key runs in an `IMMEDIATE`
//! transaction: the precondition is checked and the rows are written while
//! holding the database write lock, so concurrent processes serialize.

use std::collections::BTreeMap;

use lockbox_core::{
    KdfParams, KdfProfile, LockboxError, VaultSnapshot, MASTER_VERIFIER_ID, SALT_LEN,
};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::queries::credentials::UPSERT_SQL;

const SALT_KEY: &str = "kdf_salt";
const PARAMS_KEY: &str = "kdf_params";

/// Raw `(salt, params_json)` columns of `vault_meta`.
type RawProfile = (Option<Vec<u8>>, Option<Vec<u8>>);

fn read_meta(conn: &Connection, key: &str) -> Result<Option<Vec<u8>>, rusqlite::Error> {
    match conn.query_row(
        "SELECT value FROM vault_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    ) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_raw_profile(conn: &Connection) -> Result<RawProfile, rusqlite::Error> {
    Ok((read_meta(conn, SALT_KEY)?, read_meta(conn, PARAMS_KEY)?))
}

fn read_entries(conn: &Connection) -> Result<BTreeMap<String, Vec<u8>>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT identifier, blob FROM credentials")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;
    rows.collect()
}

fn write_profile(
    conn: &Connection,
    salt: &[u8],
    params_json: &[u8],
) -> Result<(), rusqlite::Error> {
    let mut stmt =
        conn.prepare("INSERT OR REPLACE INTO vault_meta (key, value) VALUES (?1, ?2)")?;
    stmt.execute(params![SALT_KEY, salt])?;
    stmt.execute(params![PARAMS_KEY, params_json])?;
    Ok(())
}

/// Encode a profile into the exact column values `write_profile` stores.
fn encode_profile(profile: &KdfProfile) -> Result<(Vec<u8>, Vec<u8>), LockboxError> {
    let params_json = serde_json::to_vec(&profile.params)
        .map_err(|e| LockboxError::Internal(format!("failed to encode kdf params: {e}")))?;
    Ok((profile.salt.to_vec(), params_json))
}

fn stored_form(profile: &KdfProfile) -> Result<RawProfile, LockboxError> {
    let (salt, params_json) = encode_profile(profile)?;
    Ok((Some(salt), Some(params_json)))
}

fn decode_profile(raw: RawProfile) -> Result<Option<KdfProfile>, LockboxError> {
    match raw {
        (None, None) => Ok(None),
        (Some(salt), Some(params_json)) => {
            let salt: [u8; SALT_LEN] = salt.try_into().map_err(|_| {
                LockboxError::storage(format!("corrupted kdf salt (expected {SALT_LEN} bytes)"))
            })?;
            let params: KdfParams = serde_json::from_slice(&params_json)
                .map_err(|e| LockboxError::storage(format!("corrupted kdf params: {e}")))?;
            Ok(Some(KdfProfile { salt, params }))
        }
        _ => Err(LockboxError::storage("incomplete kdf profile in vault_meta")),
    }
}

/// Read the KDF profile, `None` when no master password was ever set.
///
/// A half-written profile (salt without params or the reverse) is treated
/// as storage corruption.
pub async fn load_kdf_profile(db: &Database) -> Result<Option<KdfProfile>, LockboxError> {
    let raw = db
        .connection()
        .call(|conn| -> Result<RawProfile, rusqlite::Error> { read_raw_profile(conn) })
        .await
        .map_err(map_tr_err)?;
    decode_profile(raw)
}

/// Upsert one entry, but only while `profile` is the persisted one.
///
/// Fails with `Conflict` after a rekey or before any profile exists.
pub async fn save_under_profile(
    db: &Database,
    profile: &KdfProfile,
    identifier: &str,
    blob: &[u8],
) -> Result<(), LockboxError> {
    let expected = stored_form(profile)?;
    let identifier = identifier.to_string();
    let blob = blob.to_vec();
    let now = chrono::Utc::now().to_rfc3339();

    let written = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if read_raw_profile(&tx)? != expected {
                return Ok(false);
            }
            tx.execute(UPSERT_SQL, params![identifier, blob, now])?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if written {
        Ok(())
    } else {
        Err(LockboxError::Conflict(
            "the master key changed since this session was unlocked".to_string(),
        ))
    }
}

/// Write the first profile and the master verifier in one transaction.
///
/// Fails with `InvalidInput` when a profile or a verifier row is present.
pub async fn commit_initial(
    db: &Database,
    profile: &KdfProfile,
    verifier: &[u8],
) -> Result<(), LockboxError> {
    let (salt, params_json) = encode_profile(profile)?;
    let verifier = verifier.to_vec();
    let now = chrono::Utc::now().to_rfc3339();

    let written = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing_profile = read_raw_profile(&tx)? != (None, None);
            let existing_verifier = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM credentials WHERE identifier = ?1)",
                params![MASTER_VERIFIER_ID],
                |row| row.get::<_, bool>(0),
            )?;
            if existing_profile || existing_verifier {
                return Ok(false);
            }
            write_profile(&tx, &salt, &params_json)?;
            tx.execute(UPSERT_SQL, params![MASTER_VERIFIER_ID, verifier, now])?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if written {
        Ok(())
    } else {
        Err(LockboxError::InvalidInput(
            "master password is already set".to_string(),
        ))
    }
}

/// Replace the profile and upsert every entry, provided the stored profile
/// and credential rows still equal `previous`.
pub async fn commit_rekey(
    db: &Database,
    previous: &VaultSnapshot,
    profile: &KdfProfile,
    entries: Vec<(String, Vec<u8>)>,
) -> Result<(), LockboxError> {
    let expected_profile = stored_form(&previous.profile)?;
    let expected_entries = previous.entries.clone();
    let (salt, params_json) = encode_profile(profile)?;
    let now = chrono::Utc::now().to_rfc3339();

    let written = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let unchanged = read_raw_profile(&tx)? == expected_profile
                && read_entries(&tx)? == expected_entries;
            if !unchanged {
                return Ok(false);
            }
            write_profile(&tx, &salt, &params_json)?;
            {
                let mut upsert = tx.prepare(UPSERT_SQL)?;
                for (identifier, blob) in &entries {
                    upsert.execute(params![identifier, blob, now])?;
                }
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if written {
        Ok(())
    } else {
        Err(LockboxError::Conflict(
            "entries or master key changed while re-encrypting".to_string(),
        ))
    }
}
