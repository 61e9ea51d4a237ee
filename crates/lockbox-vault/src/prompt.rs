// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master password acquisition via TTY prompt or the LOCKBOX_MASTER_PASSWORD
//! environment variable.

use lockbox_core::LockboxError;
use secrecy::SecretString;

/// Environment variable consulted before prompting for the master password.
pub const MASTER_PASSWORD_ENV_VAR: &str = "LOCKBOX_MASTER_PASSWORD";

/// Environment variable holding the replacement password when changing it.
pub const NEW_MASTER_PASSWORD_ENV_VAR: &str = "LOCKBOX_NEW_MASTER_PASSWORD";

fn from_env(var: &str) -> Option<SecretString> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}

fn read_hidden(prompt: &str) -> Result<String, LockboxError> {
    eprint!("{prompt}");
    rpassword::read_password()
        .map_err(|e| LockboxError::InvalidInput(format!("failed to read master password: {e}")))
}

fn no_source(var: &str) -> LockboxError {
    LockboxError::InvalidInput(format!(
        "no master password provided; set {var} or run interactively"
    ))
}

/// Get the master password to unlock an existing vault.
///
/// Priority:
/// 1. `LOCKBOX_MASTER_PASSWORD` (scripts, CI)
/// 2. Interactive TTY prompt via `rpassword`
pub fn get_master_password() -> Result<SecretString, LockboxError> {
    if let Some(password) = from_env(MASTER_PASSWORD_ENV_VAR) {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let password = read_hidden("Master password: ")?;
        if password.is_empty() {
            return Err(LockboxError::InvalidInput(
                "empty master password not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(password));
    }

    Err(no_source(MASTER_PASSWORD_ENV_VAR))
}

/// Get a new master password from `env_var`, or by prompting twice.
pub fn get_new_master_password(env_var: &str, prompt: &str) -> Result<SecretString, LockboxError> {
    if let Some(password) = from_env(env_var) {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let first = read_hidden(prompt)?;
        let second = read_hidden("Confirm master password: ")?;
        if first != second {
            return Err(LockboxError::InvalidInput(
                "master passwords do not match".to_string(),
            ));
        }
        if first.is_empty() {
            return Err(LockboxError::InvalidInput(
                "empty master password not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(first));
    }

    Err(no_source(env_var))
}
