use crate::db::models::{PasswordRecord, TrustLevel, TrustRecord};
use crate::db::schema::SQLITE_INIT;
use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

/// One column as declared in the store, from `PRAGMA table_info`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Clone)]
pub struct VaultStorage {
    pool: SqlitePool,
}

impl VaultStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), ProbeError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Whether a table of this name exists in the store's catalog.
    pub async fn table_exists(&self, table: &str) -> Result<bool, ProbeError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// All user tables actually present, sorted by name.
    pub async fn table_names(&self) -> Result<Vec<String>, ProbeError> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master
             WHERE type='table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Declared columns of a table. `table` must be one of the fixed
    /// expected names; PRAGMA arguments cannot be bound.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, ProbeError> {
        let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
            sqlx::query_as(&format!("PRAGMA table_info({table})"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(_, name, decl_type, not_null, _, pk)| ColumnInfo {
                name,
                decl_type,
                not_null: not_null != 0,
                primary_key: pk != 0,
            })
            .collect())
    }

    pub async fn count(&self, table: &str) -> Result<i64, ProbeError> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Upsert keyed on `(user_id, drive_id)`: same composite key replaces
    /// the row instead of duplicating it. `created_at` of the first write
    /// is preserved; everything else takes the new value.
    pub async fn upsert_trust(&self, rec: &TrustRecord) -> Result<(), ProbeError> {
        sqlx::query(
            r#"
            INSERT INTO usb_drive_trust (
                id, user_id, drive_id, device_path, drive_label,
                trust_level, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, drive_id) DO UPDATE SET
                device_path=excluded.device_path,
                drive_label=excluded.drive_label,
                trust_level=excluded.trust_level,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&rec.id)
        .bind(&rec.user_id)
        .bind(&rec.drive_id)
        .bind(&rec.device_path)
        .bind(&rec.drive_label)
        .bind(rec.trust_level.as_str())
        .bind(rec.created_at.to_rfc3339())
        .bind(rec.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_password(&self, rec: &PasswordRecord) -> Result<(), ProbeError> {
        sqlx::query(
            r#"
            INSERT INTO usb_drive_passwords (
                id, user_id, drive_id, device_path, drive_label,
                encrypted_password, password_hint, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, drive_id) DO UPDATE SET
                device_path=excluded.device_path,
                drive_label=excluded.drive_label,
                encrypted_password=excluded.encrypted_password,
                password_hint=excluded.password_hint,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&rec.id)
        .bind(&rec.user_id)
        .bind(&rec.drive_id)
        .bind(&rec.device_path)
        .bind(&rec.drive_label)
        .bind(&rec.encrypted_password)
        .bind(&rec.password_hint)
        .bind(rec.created_at.to_rfc3339())
        .bind(rec.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn trust_by_drive_id(
        &self,
        user_id: &str,
        drive_id: &str,
    ) -> Result<Option<TrustRecord>, ProbeError> {
        let row = sqlx::query(
            r#"SELECT id, user_id, drive_id, device_path, drive_label,
               trust_level, created_at, updated_at
               FROM usb_drive_trust WHERE user_id = ? AND drive_id = ?"#,
        )
        .bind(user_id)
        .bind(drive_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_trust).transpose()
    }

    pub async fn password_by_drive_id(
        &self,
        user_id: &str,
        drive_id: &str,
    ) -> Result<Option<PasswordRecord>, ProbeError> {
        let row = sqlx::query(
            r#"SELECT id, user_id, drive_id, device_path, drive_label,
               encrypted_password, password_hint, created_at, updated_at
               FROM usb_drive_passwords WHERE user_id = ? AND drive_id = ?"#,
        )
        .bind(user_id)
        .bind(drive_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_password).transpose()
    }

    pub async fn recent_trust(&self, limit: u32) -> Result<Vec<TrustRecord>, ProbeError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, drive_id, device_path, drive_label,
               trust_level, created_at, updated_at
               FROM usb_drive_trust ORDER BY created_at DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_trust).collect()
    }

    pub async fn recent_passwords(&self, limit: u32) -> Result<Vec<PasswordRecord>, ProbeError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, drive_id, device_path, drive_label,
               encrypted_password, password_hint, created_at, updated_at
               FROM usb_drive_passwords ORDER BY created_at DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_password).collect()
    }

    fn row_to_trust(row: SqliteRow) -> Result<TrustRecord, ProbeError> {
        let trust_str: String = row.try_get("trust_level")?;
        let trust_level = TrustLevel::from_str(&trust_str)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(TrustRecord {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            drive_id: row.try_get("drive_id")?,
            device_path: row.try_get("device_path")?,
            drive_label: row.try_get("drive_label")?,
            trust_level,
            created_at: Self::decode_timestamp(&row, "created_at")?,
            updated_at: Self::decode_timestamp(&row, "updated_at")?,
        })
    }

    fn row_to_password(row: SqliteRow) -> Result<PasswordRecord, ProbeError> {
        Ok(PasswordRecord {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            drive_id: row.try_get("drive_id")?,
            device_path: row.try_get("device_path")?,
            drive_label: row.try_get("drive_label")?,
            encrypted_password: row.try_get("encrypted_password")?,
            password_hint: row.try_get("password_hint")?,
            created_at: Self::decode_timestamp(&row, "created_at")?,
            updated_at: Self::decode_timestamp(&row, "updated_at")?,
        })
    }

    fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, ProbeError> {
        let raw: String = row.try_get(column)?;
        let parsed = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);
        Ok(parsed)
    }
}
