// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault engine for the Lockbox credential vault.
//!
//! The master key is derived from the master password with Argon2id and
//! encrypts every site password with AES-256-GCM. A reserved verifier entry
//! (the master password encrypted under its own key) detects wrong
//! passwords. Site passwords come from [`PasswordGenerator`].

pub mod blob;
pub mod crypto;
pub mod generator;
pub mod kdf;
pub mod manager;
pub mod prompt;
pub mod vault;

pub use blob::{BlobDiagnosis, EncryptedBlob};
pub use generator::PasswordGenerator;
pub use manager::CryptoManager;
pub use prompt::{get_master_password, get_new_master_password};
pub use vault::{Vault, VaultSession};
