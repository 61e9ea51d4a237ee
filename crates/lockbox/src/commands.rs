// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault subcommands. Each takes an already opened [`Vault`] and writes its
//! user-facing output to `out`; password acquisition happens in `main`.

use std::io::Write;

use colored::Colorize;
use lockbox_core::LockboxError;
use lockbox_vault::{BlobDiagnosis, Vault};
use secrecy::{ExposeSecret, SecretString};

fn io_err(e: std::io::Error) -> LockboxError {
    LockboxError::Internal(format!("failed to write output: {e}"))
}

/// `lockbox init`
pub async fn run_init(
    vault: &Vault,
    password: &SecretString,
    out: &mut impl Write,
) -> Result<(), LockboxError> {
    vault.set_master_password(password).await?.lock();
    writeln!(out, "Vault initialized.").map_err(io_err)
}

/// `lockbox check`: exit status says whether the password is correct.
pub async fn run_check(
    vault: &Vault,
    password: &SecretString,
    out: &mut impl Write,
) -> Result<bool, LockboxError> {
    let ok = vault.authenticate(password).await?;
    let verdict = if ok { "correct" } else { "wrong" };
    writeln!(out, "Master password is {verdict}.").map_err(io_err)?;
    Ok(ok)
}

/// `lockbox add <site>`: prints the generated password.
pub async fn run_add(
    vault: &Vault,
    password: &SecretString,
    site: &str,
    out: &mut impl Write,
) -> Result<(), LockboxError> {
    let session = vault.unlock(password).await?;
    let generated = session.add_site(site).await?;
    writeln!(out, "{}", generated.expose_secret()).map_err(io_err)
}

/// `lockbox get <site>`
pub async fn run_get(
    vault: &Vault,
    password: &SecretString,
    site: &str,
    out: &mut impl Write,
) -> Result<(), LockboxError> {
    let session = vault.unlock(password).await?;
    let revealed = session.reveal_site_password(site).await?;
    writeln!(out, "{}", revealed.expose_secret()).map_err(io_err)
}

/// `lockbox list`
pub async fn run_list(
    vault: &Vault,
    password: &SecretString,
    out: &mut impl Write,
) -> Result<(), LockboxError> {
    let session = vault.unlock(password).await?;
    for site in session.list_site_identifiers().await? {
        writeln!(out, "{site}").map_err(io_err)?;
    }
    Ok(())
}

/// `lockbox remove <site>`
pub async fn run_remove(
    vault: &Vault,
    password: &SecretString,
    site: &str,
    out: &mut impl Write,
) -> Result<(), LockboxError> {
    let session = vault.unlock(password).await?;
    session.remove_site(site).await?;
    writeln!(out, "Removed {site}.").map_err(io_err)
}

/// `lockbox passwd`
pub async fn run_passwd(
    vault: &Vault,
    current: &SecretString,
    new: &SecretString,
    out: &mut impl Write,
) -> Result<(), LockboxError> {
    let mut session = vault.unlock(current).await?;
    session.change_master_password(new).await?;
    writeln!(out, "Master password changed.").map_err(io_err)
}

/// `lockbox verify`: returns `true` when every entry is intact.
pub async fn run_verify(
    vault: &Vault,
    password: &SecretString,
    json: bool,
    out: &mut impl Write,
) -> Result<bool, LockboxError> {
    let session = vault.unlock(password).await?;
    let report = session.verify_integrity().await?;
    let all_intact = report.iter().all(|(_, d)| *d == BlobDiagnosis::Intact);

    if json {
        let entries: Vec<_> = report
            .iter()
            .map(|(identifier, diagnosis)| {
                let (status, reason) = match diagnosis {
                    BlobDiagnosis::Intact => ("intact", None),
                    BlobDiagnosis::AuthenticationFailed => ("authentication_failed", None),
                    BlobDiagnosis::Malformed { reason } => ("malformed", Some(reason.as_str())),
                };
                serde_json::json!({ "identifier": identifier, "status": status, "reason": reason })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&entries)
            .map_err(|e| LockboxError::Internal(format!("failed to render report: {e}")))?;
        writeln!(out, "{rendered}").map_err(io_err)?;
        return Ok(all_intact);
    }

    for (identifier, diagnosis) in &report {
        let status = match diagnosis {
            BlobDiagnosis::Intact => "ok".green(),
            BlobDiagnosis::AuthenticationFailed => "FAILED (authentication)".red(),
            BlobDiagnosis::Malformed { reason } => format!("FAILED ({reason})").red(),
        };
        writeln!(out, "{identifier}: {status}").map_err(io_err)?;
    }
    Ok(all_intact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_core::CredentialStore;
    use lockbox_test_utils::{secret, TestHarness};

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn init_then_check() {
        let harness = TestHarness::builder().build().await.unwrap();
        let mut out = Vec::new();

        run_init(&harness.vault, &secret("Secret1!"), &mut out).await.unwrap();
        assert!(run_check(&harness.vault, &secret("Secret1!"), &mut out).await.unwrap());
        assert!(!run_check(&harness.vault, &secret("wrong"), &mut out).await.unwrap());

        let text = output(out);
        assert!(text.contains("Vault initialized."));
        assert!(text.contains("Master password is correct."));
        assert!(text.contains("Master password is wrong."));
    }

    #[tokio::test]
    async fn add_prints_the_password_get_returns() {
        let harness = TestHarness::builder().build().await.unwrap();
        let pw = secret("Secret1!");
        run_init(&harness.vault, &pw, &mut Vec::new()).await.unwrap();

        let mut added = Vec::new();
        run_add(&harness.vault, &pw, "example.com", &mut added).await.unwrap();
        let mut got = Vec::new();
        run_get(&harness.vault, &pw, "example.com", &mut got).await.unwrap();

        let added = output(added);
        assert_eq!(added.trim_end().len(), 12);
        assert_eq!(added, output(got));
    }

    #[tokio::test]
    async fn list_and_remove() {
        let harness = TestHarness::builder().build().await.unwrap();
        let pw = secret("pw");
        run_init(&harness.vault, &pw, &mut Vec::new()).await.unwrap();
        run_add(&harness.vault, &pw, "a.com", &mut Vec::new()).await.unwrap();
        run_add(&harness.vault, &pw, "b.com", &mut Vec::new()).await.unwrap();
        run_remove(&harness.vault, &pw, "a.com", &mut Vec::new()).await.unwrap();

        let mut listed = Vec::new();
        run_list(&harness.vault, &pw, &mut listed).await.unwrap();
        assert_eq!(output(listed), "b.com\n");
    }

    #[tokio::test]
    async fn commands_with_wrong_password_fail() {
        let harness = TestHarness::builder().build().await.unwrap();
        run_init(&harness.vault, &secret("pw"), &mut Vec::new()).await.unwrap();

        let result = run_list(&harness.vault, &secret("nope"), &mut Vec::new()).await;
        assert!(matches!(result, Err(LockboxError::WrongPassword)));
    }

    #[tokio::test]
    async fn passwd_switches_password() {
        let harness = TestHarness::builder().build().await.unwrap();
        run_init(&harness.vault, &secret("old"), &mut Vec::new()).await.unwrap();
        run_passwd(&harness.vault, &secret("old"), &secret("new"), &mut Vec::new())
            .await
            .unwrap();

        assert!(harness.vault.authenticate(&secret("new")).await.unwrap());
    }

    #[tokio::test]
    async fn verify_json_reports_each_entry() {
        let harness = TestHarness::builder().build().await.unwrap();
        let pw = secret("pw");
        run_init(&harness.vault, &pw, &mut Vec::new()).await.unwrap();
        run_add(&harness.vault, &pw, "a.com", &mut Vec::new()).await.unwrap();
        harness.store.save_password("broken", &[1, 2, 3]).await.unwrap();

        let mut out = Vec::new();
        let intact = run_verify(&harness.vault, &pw, true, &mut out).await.unwrap();
        assert!(!intact);

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        let broken = entries.iter().find(|e| e["identifier"] == "broken").unwrap();
        assert_eq!(broken["status"], "malformed");
    }
}
