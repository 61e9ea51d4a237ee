// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Random site password generation from the OS CSPRNG.

use lockbox_config::model::GeneratorConfig;
use lockbox_core::LockboxError;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::OsRng;

/// Characters a generated password may contain.
pub const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{};:,.<>?/~|";

/// Default generated password length.
pub const DEFAULT_LENGTH: usize = 12;

/// Produces passwords of a fixed length with every character drawn
/// independently and uniformly from [`ALPHABET`].
#[derive(Debug, Clone, Copy)]
pub struct PasswordGenerator {
    length: usize,
}

impl PasswordGenerator {
    pub fn new(length: usize) -> Result<Self, LockboxError> {
        if length == 0 {
            return Err(LockboxError::InvalidInput(
                "password length must be at least 1".to_string(),
            ));
        }
        Ok(Self { length })
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, LockboxError> {
        Self::new(config.length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet() -> &'static [u8] {
        ALPHABET
    }

    /// A fresh random password of exactly `length` characters.
    pub fn get_random_password(&self) -> String {
        // Uniform rejects out-of-range samples, so there is no modulo bias.
        let index = Uniform::new(0, ALPHABET.len());
        index
            .sample_iter(OsRng)
            .take(self.length)
            .map(|i| ALPHABET[i] as char)
            .collect()
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}
