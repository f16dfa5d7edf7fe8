use crate::db::models::TrustLevel;
use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Runtime configuration, overridable via `VAULT_PROBE_*` environment
/// variables (e.g. `VAULT_PROBE_USER_ID`, `VAULT_PROBE_SEED_DRIVE_ID`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application identifiers whose per-user data directories are probed.
    /// The installing application migrated identifiers at some point, so
    /// both candidates stay configured rather than guessing a canonical one.
    pub app_ids: Vec<String>,
    /// Database filename, identical across all candidate locations.
    pub db_filename: String,
    /// Owner of the records this tool writes.
    pub user_id: String,
    /// Upper bound on recent rows sampled per table in the schema report.
    pub sample_limit: u32,
    /// When set, run the upsert verifier against this drive id after the
    /// schema report. Unset means a read-only inspection run.
    pub seed_drive_id: Option<String>,
    pub seed_trust_level: TrustLevel,
    pub seed_ciphertext: String,
    pub seed_hint: String,
    pub seed_label: String,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_ids: vec!["com.zap-vault".to_string(), "zap-vault".to_string()],
            db_filename: "vault.db".to_string(),
            user_id: "admin".to_string(),
            sample_limit: 5,
            seed_drive_id: None,
            seed_trust_level: TrustLevel::Trusted,
            seed_ciphertext: "encrypted_test_password".to_string(),
            seed_hint: "test hint".to_string(),
            seed_label: "TEST_DRIVE".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("VAULT_PROBE_"))
            .extract()
    }
}

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("invalid VAULT_PROBE_* configuration"));
