use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error as ThisError;

/// Trust decision for a physical drive, as stored in `trust_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Trusted,
    Untrusted,
    Blocked,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Trusted => "trusted",
            TrustLevel::Untrusted => "untrusted",
            TrustLevel::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("unknown trust level: {0}")]
pub struct UnknownTrustLevel(String);

impl FromStr for TrustLevel {
    type Err = UnknownTrustLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trusted" => Ok(TrustLevel::Trusted),
            "untrusted" => Ok(TrustLevel::Untrusted),
            "blocked" => Ok(TrustLevel::Blocked),
            other => Err(UnknownTrustLevel(other.to_string())),
        }
    }
}

/// One row of `usb_drive_trust`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrustRecord {
    pub id: String,
    pub user_id: String,
    pub drive_id: String,
    /// OS device node; may change across reinsertions of the same drive.
    pub device_path: String,
    pub drive_label: Option<String>,
    pub trust_level: TrustLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of `usb_drive_passwords`. The ciphertext is opaque to this tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasswordRecord {
    pub id: String,
    pub user_id: String,
    pub drive_id: String,
    pub device_path: String,
    pub drive_label: Option<String>,
    pub encrypted_password: String,
    pub password_hint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
