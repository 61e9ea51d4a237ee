// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for pluggable persistence backends.
//!
//! Traits use `#[async_trait]` so they can be held as `Arc<dyn _>`.

pub mod store;

pub use store::CredentialStore;
