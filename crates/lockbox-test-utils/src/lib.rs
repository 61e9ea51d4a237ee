// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lockbox integration tests.
//!
//! # Components
//!
//! - [`MemoryCredentialStore`] - in-process store with transactional rekey
//! - [`FailingCredentialStore`] - store whose every call is a storage failure
//! - [`TestHarness`] - a vault over either store kind with cheap KDF costs

pub mod failing_store;
pub mod harness;
pub mod memory_store;

pub use failing_store::FailingCredentialStore;
pub use harness::{fast_vault_config, secret, TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryCredentialStore;
