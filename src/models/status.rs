use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Local-only sync bookkeeping tag carried by every cached record.
///
/// `Conflict` is transient: the resolver collapses it to a single winning
/// record during the same sync pass, so the UI never observes a stuck
/// conflict. The tag is never pushed to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Synced,
    Conflict,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Pending => write!(f, "pending"),
            RecordStatus::Synced => write!(f, "synced"),
            RecordStatus::Conflict => write!(f, "conflict"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RecordStatus::Pending),
            "synced" => Ok(RecordStatus::Synced),
            "conflict" => Ok(RecordStatus::Conflict),
            _ => Err(format!(
                "Invalid record status '{}'. Valid options: pending, synced, conflict",
                s
            )),
        }
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Pending
    }
}
