// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lockbox - a local credential vault.
//!
//! This is the binary entry point. Passwords and listings go to stdout,
//! prompts, logs and errors to stderr.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod backup;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lockbox_config::model::LockboxConfig;
use lockbox_core::LockboxError;
use lockbox_storage::SqliteCredentialStore;
use lockbox_vault::prompt::{get_master_password, get_new_master_password};
use lockbox_vault::prompt::{MASTER_PASSWORD_ENV_VAR, NEW_MASTER_PASSWORD_ENV_VAR};
use lockbox_vault::Vault;

/// Lockbox - a local credential vault with generated per-site passwords.
#[derive(Parser, Debug)]
#[command(name = "lockbox", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Set the master password of a new vault.
    Init,
    /// Check a master password without unlocking anything else.
    Check,
    /// Generate and store a password for a site, then print it.
    Add { site: String },
    /// Print the stored password for a site.
    Get { site: String },
    /// List stored site identifiers.
    List,
    /// Delete a site entry.
    Remove { site: String },
    /// Change the master password and re-encrypt every entry.
    Passwd,
    /// Check every stored entry decrypts under the master password.
    Verify {
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Copy the vault database to a file.
    Backup { dest: PathBuf },
    /// Replace the vault database with a backup copy.
    Restore { src: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => lockbox_config::load_and_validate_path(path),
        None => lockbox_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            lockbox_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.general.log_level);

    match run(cli.command, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("lockbox: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run one subcommand. `Ok(false)` means it completed with a negative
/// verdict (wrong password on `check`, damaged entries on `verify`).
async fn run(command: Commands, config: &LockboxConfig) -> Result<bool, LockboxError> {
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Init => {
            let vault = open_vault(config).await?;
            if vault.is_initialized().await? {
                return Err(LockboxError::InvalidInput(
                    "vault already has a master password; use `lockbox passwd`".to_string(),
                ));
            }
            let password =
                get_new_master_password(MASTER_PASSWORD_ENV_VAR, "New master password: ")?;
            commands::run_init(&vault, &password, &mut out).await?;
        }
        Commands::Check => {
            let vault = open_vault(config).await?;
            let password = get_master_password()?;
            return commands::run_check(&vault, &password, &mut out).await;
        }
        Commands::Add { site } => {
            let vault = open_vault(config).await?;
            let password = get_master_password()?;
            commands::run_add(&vault, &password, &site, &mut out).await?;
        }
        Commands::Get { site } => {
            let vault = open_vault(config).await?;
            let password = get_master_password()?;
            commands::run_get(&vault, &password, &site, &mut out).await?;
        }
        Commands::List => {
            let vault = open_vault(config).await?;
            let password = get_master_password()?;
            commands::run_list(&vault, &password, &mut out).await?;
        }
        Commands::Remove { site } => {
            let vault = open_vault(config).await?;
            let password = get_master_password()?;
            commands::run_remove(&vault, &password, &site, &mut out).await?;
        }
        Commands::Passwd => {
            let vault = open_vault(config).await?;
            let current = get_master_password()?;
            let new =
                get_new_master_password(NEW_MASTER_PASSWORD_ENV_VAR, "New master password: ")?;
            commands::run_passwd(&vault, &current, &new, &mut out).await?;
        }
        Commands::Verify { json } => {
            let vault = open_vault(config).await?;
            let password = get_master_password()?;
            return commands::run_verify(&vault, &password, json, &mut out).await;
        }
        // The database is copied directly; no vault connection is opened.
        Commands::Backup { dest } => {
            let db_path = PathBuf::from(&config.storage.database_path);
            let size = blocking(move || backup::run_backup(&db_path, &dest)).await?;
            eprintln!("Backup complete: {size} bytes written.");
        }
        Commands::Restore { src } => {
            let db_path = PathBuf::from(&config.storage.database_path);
            let size = blocking(move || backup::run_restore(&db_path, &src)).await?;
            eprintln!("Restore complete: {size} bytes restored.");
        }
    }
    Ok(true)
}

async fn open_vault(config: &LockboxConfig) -> Result<Vault, LockboxError> {
    let store = SqliteCredentialStore::open(&config.storage).await?;
    Vault::from_config(Arc::new(store), config)
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, LockboxError> + Send + 'static,
) -> Result<T, LockboxError> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LockboxError::Internal(format!("blocking task failed: {e}")))?
}

/// Initialize the tracing subscriber with an EnvFilter.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so it
/// never mixes with passwords printed on stdout.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lockbox={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
