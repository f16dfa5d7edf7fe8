//! Write-then-read verification against the two drive tables: upsert a
//! seed record derived from a drive id, re-read it on the same connection,
//! and report pass/fail per table with the resulting row counts.

use crate::config::Config;
use crate::db::models::{PasswordRecord, TrustRecord};
use crate::db::sqlite::VaultStorage;
use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct TableVerification {
    pub table: &'static str,
    pub passed: bool,
    pub detail: Option<String>,
    pub row_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub drive_id: String,
    pub trust: TableVerification,
    pub passwords: TableVerification,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.trust.passed && self.passwords.passed
    }
}

/// Device node derived from the drive id by the application's fixed naming
/// convention: `usb_sde1` maps to `/dev/sde1`.
pub fn device_path_for(drive_id: &str) -> String {
    format!("/dev/{}", drive_id.strip_prefix("usb_").unwrap_or(drive_id))
}

pub fn seed_trust_record(cfg: &Config, drive_id: &str, now: DateTime<Utc>) -> TrustRecord {
    TrustRecord {
        id: format!("trust_{drive_id}"),
        user_id: cfg.user_id.clone(),
        drive_id: drive_id.to_string(),
        device_path: device_path_for(drive_id),
        drive_label: Some(cfg.seed_label.clone()),
        trust_level: cfg.seed_trust_level,
        created_at: now,
        updated_at: now,
    }
}

pub fn seed_password_record(cfg: &Config, drive_id: &str, now: DateTime<Utc>) -> PasswordRecord {
    PasswordRecord {
        id: format!("pwd_{drive_id}"),
        user_id: cfg.user_id.clone(),
        drive_id: drive_id.to_string(),
        device_path: device_path_for(drive_id),
        drive_label: Some(cfg.seed_label.clone()),
        encrypted_password: cfg.seed_ciphertext.clone(),
        password_hint: Some(cfg.seed_hint.clone()),
        created_at: now,
        updated_at: now,
    }
}

/// Run both table checks. A failure in one table aborts only that table's
/// remaining steps; the other check still runs.
pub async fn verify_round_trip(
    storage: &VaultStorage,
    cfg: &Config,
    drive_id: &str,
    now: DateTime<Utc>,
) -> VerifyReport {
    let trust = check_table(
        "usb_drive_trust",
        check_trust(storage, cfg, drive_id, now).await,
        storage,
    )
    .await;
    let passwords = check_table(
        "usb_drive_passwords",
        check_password(storage, cfg, drive_id, now).await,
        storage,
    )
    .await;

    VerifyReport {
        drive_id: drive_id.to_string(),
        trust,
        passwords,
    }
}

async fn check_table(
    table: &'static str,
    outcome: Result<(), ProbeError>,
    storage: &VaultStorage,
) -> TableVerification {
    let row_count = match storage.count(table).await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(table, error = %e, "row count unavailable");
            None
        }
    };
    match outcome {
        Ok(()) => TableVerification {
            table,
            passed: true,
            detail: None,
            row_count,
        },
        Err(e) => TableVerification {
            table,
            passed: false,
            detail: Some(e.to_string()),
            row_count,
        },
    }
}

async fn check_trust(
    storage: &VaultStorage,
    cfg: &Config,
    drive_id: &str,
    now: DateTime<Utc>,
) -> Result<(), ProbeError> {
    let rec = seed_trust_record(cfg, drive_id, now);
    storage.upsert_trust(&rec).await?;

    // The write must be visible to an immediate read on this connection.
    let found = storage
        .trust_by_drive_id(&rec.user_id, &rec.drive_id)
        .await?
        .ok_or_else(|| {
            ProbeError::Verification(format!("trust row for {drive_id} missing after upsert"))
        })?;
    if found.trust_level != rec.trust_level {
        return Err(ProbeError::Verification(format!(
            "trust level read back as {}, expected {}",
            found.trust_level, rec.trust_level
        )));
    }
    Ok(())
}

async fn check_password(
    storage: &VaultStorage,
    cfg: &Config,
    drive_id: &str,
    now: DateTime<Utc>,
) -> Result<(), ProbeError> {
    let rec = seed_password_record(cfg, drive_id, now);
    storage.upsert_password(&rec).await?;

    let found = storage
        .password_by_drive_id(&rec.user_id, &rec.drive_id)
        .await?
        .ok_or_else(|| {
            ProbeError::Verification(format!("password row for {drive_id} missing after upsert"))
        })?;
    if found.password_hint != rec.password_hint {
        return Err(ProbeError::Verification(format!(
            "password hint read back as {:?}, expected {:?}",
            found.password_hint, rec.password_hint
        )));
    }
    Ok(())
}
