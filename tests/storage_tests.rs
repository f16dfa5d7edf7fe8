use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use std::{fs, path::PathBuf};
use vault_probe::config::Config;
use vault_probe::db::models::TrustLevel;
use vault_probe::db::sqlite::VaultStorage;
use vault_probe::report::schema_report;
use vault_probe::verify::{
    device_path_for, seed_password_record, seed_trust_record, verify_round_trip,
};

async fn open_temp_store(tag: &str) -> (VaultStorage, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "vault-probe-{}-{}-{}.sqlite",
        tag,
        std::process::id(),
        nanos
    ));

    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", temp_path.display()))
        .expect("bad database url")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("failed to open sqlite store");

    (VaultStorage::new(pool), temp_path)
}

async fn close_and_remove(storage: VaultStorage, path: PathBuf) {
    storage.pool().close().await;
    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn trust_upsert_is_idempotent_per_drive() {
    let (storage, path) = open_temp_store("trust-idem").await;
    storage.init_schema().await.expect("init schema failed");

    let cfg = Config::default();
    let t0 = Utc.with_ymd_and_hms(2025, 9, 1, 15, 54, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2025, 9, 1, 16, 10, 0).unwrap();

    let first = seed_trust_record(&cfg, "usb_sde1", t0);
    assert_eq!(first.id, "trust_usb_sde1");
    storage.upsert_trust(&first).await.expect("first upsert failed");

    let mut second = seed_trust_record(&cfg, "usb_sde1", t1);
    second.trust_level = TrustLevel::Blocked;
    storage.upsert_trust(&second).await.expect("second upsert failed");

    assert_eq!(storage.count("usb_drive_trust").await.unwrap(), 1);

    let row = storage
        .trust_by_drive_id(&cfg.user_id, "usb_sde1")
        .await
        .expect("read failed")
        .expect("row missing after upsert");
    assert_eq!(row.updated_at, t1);
    assert_eq!(row.created_at, t0);
    assert_eq!(row.trust_level, TrustLevel::Blocked);

    close_and_remove(storage, path).await;
}

#[tokio::test]
async fn password_write_is_immediately_readable() {
    let (storage, path) = open_temp_store("pwd-read").await;
    storage.init_schema().await.expect("init schema failed");

    let cfg = Config::default();
    let now = Utc.with_ymd_and_hms(2025, 9, 1, 15, 54, 0).unwrap();
    let rec = seed_password_record(&cfg, "usb_sde1", now);
    assert_eq!(rec.id, "pwd_usb_sde1");

    storage.upsert_password(&rec).await.expect("upsert failed");

    let row = storage
        .password_by_drive_id(&cfg.user_id, "usb_sde1")
        .await
        .expect("read failed")
        .expect("row missing after upsert");
    assert_eq!(row.password_hint.as_deref(), Some("test hint"));
    assert_eq!(row.device_path, "/dev/sde1");

    close_and_remove(storage, path).await;
}

#[tokio::test]
async fn round_trip_increases_each_count_by_one() {
    let (storage, path) = open_temp_store("counts").await;
    storage.init_schema().await.expect("init schema failed");

    let cfg = Config::default();
    let trust_before = storage.count("usb_drive_trust").await.unwrap();
    let pwd_before = storage.count("usb_drive_passwords").await.unwrap();

    let verdict = verify_round_trip(&storage, &cfg, "usb_sde1", Utc::now()).await;
    assert!(verdict.passed(), "verification failed: {verdict:?}");
    assert_eq!(verdict.trust.row_count, Some(trust_before + 1));
    assert_eq!(verdict.passwords.row_count, Some(pwd_before + 1));

    close_and_remove(storage, path).await;
}

#[tokio::test]
async fn verification_fails_without_schema() {
    let (storage, path) = open_temp_store("no-schema").await;

    let cfg = Config::default();
    let verdict = verify_round_trip(&storage, &cfg, "usb_sde1", Utc::now()).await;
    assert!(!verdict.trust.passed);
    assert!(!verdict.passwords.passed);
    assert!(verdict.trust.detail.is_some());
    assert_eq!(verdict.trust.row_count, None);

    close_and_remove(storage, path).await;
}

#[tokio::test]
async fn report_lists_present_tables_when_one_is_missing() {
    let (storage, path) = open_temp_store("partial-schema").await;

    // Only part of the expected schema, as if the trust migration never ran.
    sqlx::query(
        "CREATE TABLE users (
            id TEXT PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(storage.pool())
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE usb_drive_passwords (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            drive_id TEXT NOT NULL,
            device_path TEXT NOT NULL,
            drive_label TEXT,
            encrypted_password TEXT NOT NULL,
            password_hint TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, drive_id)
        )",
    )
    .execute(storage.pool())
    .await
    .unwrap();

    let report = schema_report(&storage, 5).await.expect("report failed");
    assert_eq!(report.missing_tables(), vec!["usb_drive_trust"]);
    assert_eq!(report.all_tables, vec!["usb_drive_passwords", "users"]);
    assert!(report.recent_trust.is_empty());
    assert_eq!(report.user_count, Some(0));

    let trust = report
        .tables
        .iter()
        .find(|t| t.name == "usb_drive_trust")
        .unwrap();
    assert!(!trust.present);
    assert!(trust.columns.is_empty());
    assert_eq!(trust.row_count, None);

    close_and_remove(storage, path).await;
}

#[tokio::test]
async fn report_samples_recent_rows_and_columns() {
    let (storage, path) = open_temp_store("full-report").await;
    storage.init_schema().await.expect("init schema failed");

    let cfg = Config::default();
    let older = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2025, 9, 2, 10, 0, 0).unwrap();
    storage
        .upsert_trust(&seed_trust_record(&cfg, "usb_sdb1", older))
        .await
        .unwrap();
    storage
        .upsert_trust(&seed_trust_record(&cfg, "usb_sde1", newer))
        .await
        .unwrap();
    storage
        .upsert_password(&seed_password_record(&cfg, "usb_sde1", newer))
        .await
        .unwrap();

    let report = schema_report(&storage, 5).await.expect("report failed");
    assert!(report.missing_tables().is_empty());

    // Most recent first.
    assert_eq!(report.recent_trust.len(), 2);
    assert_eq!(report.recent_trust[0].drive_id, "usb_sde1");
    assert_eq!(report.recent_trust[1].drive_id, "usb_sdb1");

    assert_eq!(report.recent_passwords.len(), 1);
    assert_eq!(
        report.recent_passwords[0].password_hint.as_deref(),
        Some("test hint")
    );

    let trust = report
        .tables
        .iter()
        .find(|t| t.name == "usb_drive_trust")
        .unwrap();
    let column_names: Vec<&str> = trust.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        column_names,
        vec![
            "id",
            "user_id",
            "drive_id",
            "device_path",
            "drive_label",
            "trust_level",
            "created_at",
            "updated_at"
        ]
    );
    assert!(trust.columns[0].primary_key);

    close_and_remove(storage, path).await;
}

#[test]
fn device_path_strips_the_usb_prefix() {
    assert_eq!(device_path_for("usb_sde1"), "/dev/sde1");
    assert_eq!(device_path_for("sdb2"), "/dev/sdb2");
}
