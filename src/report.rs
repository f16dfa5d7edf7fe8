//! In-memory schema report for a resolved vault store: which expected
//! tables exist, their declared columns, row counts, and a bounded sample
//! of the most recent rows. Terminal formatting is up to the caller.

use crate::db::models::TrustRecord;
use crate::db::schema::EXPECTED_TABLES;
use crate::db::sqlite::{ColumnInfo, VaultStorage};
use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TableReport {
    pub name: String,
    pub present: bool,
    pub columns: Vec<ColumnInfo>,
    pub row_count: Option<i64>,
}

/// Password sample with the ciphertext column left out; the hint is the
/// user-facing part an operator needs to recognize an entry.
#[derive(Debug, Serialize)]
pub struct PasswordSample {
    pub id: String,
    pub user_id: String,
    pub drive_id: String,
    pub device_path: String,
    pub drive_label: Option<String>,
    pub password_hint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub tables: Vec<TableReport>,
    /// Every user table actually in the store. When an expected table is
    /// absent this is the primary diagnostic: it shows whether the
    /// application is writing to a different store or the migration never
    /// ran.
    pub all_tables: Vec<String>,
    pub recent_trust: Vec<TrustRecord>,
    pub recent_passwords: Vec<PasswordSample>,
    pub user_count: Option<i64>,
}

impl SchemaReport {
    pub fn missing_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| !t.present)
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// Build the full report. Any store-level failure aborts the report as a
/// whole; no partial result is returned after a catalog or query error.
pub async fn schema_report(
    storage: &VaultStorage,
    sample_limit: u32,
) -> Result<SchemaReport, ProbeError> {
    let all_tables = storage.table_names().await?;

    let mut tables = Vec::with_capacity(EXPECTED_TABLES.len());
    for name in EXPECTED_TABLES {
        // Existence comes from the catalog, not a data query, so "table
        // missing" never gets conflated with "table empty".
        let present = storage.table_exists(name).await?;
        let (columns, row_count) = if present {
            (
                storage.table_columns(name).await?,
                Some(storage.count(name).await?),
            )
        } else {
            (Vec::new(), None)
        };
        tables.push(TableReport {
            name: name.to_string(),
            present,
            columns,
            row_count,
        });
    }

    let trust_present = tables.iter().any(|t| t.name == "usb_drive_trust" && t.present);
    let passwords_present = tables
        .iter()
        .any(|t| t.name == "usb_drive_passwords" && t.present);
    let users_present = tables.iter().any(|t| t.name == "users" && t.present);

    let recent_trust = if trust_present {
        storage.recent_trust(sample_limit).await?
    } else {
        Vec::new()
    };
    let recent_passwords = if passwords_present {
        storage
            .recent_passwords(sample_limit)
            .await?
            .into_iter()
            .map(|p| PasswordSample {
                id: p.id,
                user_id: p.user_id,
                drive_id: p.drive_id,
                device_path: p.device_path,
                drive_label: p.drive_label,
                password_hint: p.password_hint,
                created_at: p.created_at,
                updated_at: p.updated_at,
            })
            .collect()
    } else {
        Vec::new()
    };
    let user_count = if users_present {
        Some(storage.count("users").await?)
    } else {
        None
    };

    Ok(SchemaReport {
        tables,
        all_tables,
        recent_trust,
        recent_passwords,
        user_count,
    })
}
