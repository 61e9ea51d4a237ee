// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the store and the vault engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved identifier holding the master password verifier blob.
pub const MASTER_VERIFIER_ID: &str = "MAINPW";

/// Length of the per-vault Argon2id salt.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters, persisted as JSON next to the salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Everything besides the password needed to re-derive a vault's master key.
///
/// Neither field is secret. Losing the profile makes every stored blob
/// unreadable, so it is written in the same transaction as the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfProfile {
    pub salt: [u8; SALT_LEN],
    pub params: KdfParams,
}

/// The persisted state a rekey was computed from.
///
/// A store commits the rekey only while it still holds exactly this profile
/// and these blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub profile: KdfProfile,
    pub entries: BTreeMap<String, Vec<u8>>,
}

/// Returns `true` when `identifier` is reserved for vault bookkeeping.
pub fn is_reserved_identifier(identifier: &str) -> bool {
    identifier == MASTER_VERIFIER_ID
}
