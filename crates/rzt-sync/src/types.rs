use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rzt_worker::ImportOutput;

/// Restore behavior switches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Import newer cloud backups without being asked.
    #[serde(default = "default_auto")]
    pub auto: bool,
}

fn default_auto() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { auto: true }
    }
}

/// One stored backup as listed by a source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub name: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Why a restore did not run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    AutoDisabled,
    NoManifest,
    NoNewerBackup,
    NoBackup,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AutoDisabled => "auto import disabled",
            Self::NoManifest => "no manifest",
            Self::NoNewerBackup => "no newer backup",
            Self::NoBackup => "no backup available",
        })
    }
}

/// Result of a restore attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum RestoreOutcome {
    /// The backup was verified and imported.
    Imported(ImportOutput),
    Skipped(SkipReason),
    /// Verification or the import itself refused the backup.
    Rejected(String),
}

impl RestoreOutcome {
    pub fn performed(&self) -> bool {
        matches!(self, Self::Imported(_))
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Imported(_) => None,
            Self::Skipped(reason) => Some(reason.to_string()),
            Self::Rejected(reason) => Some(reason.clone()),
        }
    }

    /// Total records inserted, across kinds.
    pub fn imported(&self) -> u64 {
        match self {
            Self::Imported(output) => output.inserted.total(),
            _ => 0,
        }
    }
}
