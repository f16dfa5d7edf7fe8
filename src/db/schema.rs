//! SQL DDL for initializing the vault store.
//! SQLite-first design, matching the layout the vault application writes.

/// SQLite schema with:
/// - TEXT primary keys assigned by the application, not AUTOINCREMENT
/// - `(user_id, drive_id)` UNIQUE on both drive tables, the upsert key
/// - timestamps stored as RFC3339 TEXT
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS usb_drive_trust (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    drive_id TEXT NOT NULL,
    device_path TEXT NOT NULL,
    drive_label TEXT,
    trust_level TEXT NOT NULL DEFAULT 'untrusted',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, drive_id)
);

CREATE TABLE IF NOT EXISTS usb_drive_passwords (
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
);

CREATE INDEX IF NOT EXISTS idx_usb_drive_trust_drive_id ON usb_drive_trust(drive_id);
CREATE INDEX IF NOT EXISTS idx_usb_drive_passwords_drive_id ON usb_drive_passwords(drive_id);
"#;

/// Tables this tool expects the vault application to have created.
pub const EXPECTED_TABLES: [&str; 3] = ["users", "usb_drive_trust", "usb_drive_passwords"];
