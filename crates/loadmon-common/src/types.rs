use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored machine, registered once at configuration time.
///
/// `id` is the stable storage key; samples reference it and a sample with
/// an unknown id is rejected by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: i64,
    /// Short unique name used in export filenames and reports.
    pub alias: String,
    /// Address the probe connects to (hostname or IP).
    pub address: String,
}

/// One load observation from one host. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Logged-in user count at sampling time.
    pub users: u32,
    /// One-minute load average.
    pub load: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, users: u32, load: f64) -> Self {
        Self {
            timestamp,
            users,
            load,
        }
    }
}
