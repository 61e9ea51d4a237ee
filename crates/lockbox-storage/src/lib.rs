// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Lockbox credential vault.
//!
//! Provides a WAL-mode SQLite database with embedded migrations, a
//! single-connection concurrency model via `tokio-rusqlite`, and the
//! [`SqliteCredentialStore`] implementation of
//! [`lockbox_core::CredentialStore`].

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteCredentialStore;
pub use database::Database;
