//! Durable sample storage for collected load metrics.
//!
//! The default implementation ([`store::SqliteSampleStore`]) keeps two
//! tables in a single SQLite database with WAL mode: `machine` for
//! registered hosts and `record` for append-only samples. [`export`]
//! projects stored samples into the CSV table consumed downstream.

pub mod error;
pub mod export;
pub mod store;


use error::Result;
use loadmon_common::types::{Host, Sample};

/// Persistence backend for hosts and their samples.
///
/// Implementations must be safe to share across threads (`Send + Sync`):
/// per-host probes may append concurrently, and rows are independent so no
/// cross-row coordination is needed.
pub trait SampleStore: Send + Sync {
    /// Registers a host by alias, returning the stored row. Idempotent:
    /// re-registering an existing alias returns the existing host with its
    /// original id.
    fn register_host(&self, alias: &str, address: &str) -> Result<Host>;

    /// Returns all registered hosts ordered by id.
    fn hosts(&self) -> Result<Vec<Host>>;

    /// Appends one sample for the given host. Rejects an unknown host id
    /// with [`error::StoreError::UnknownHost`].
    fn append(&self, host_id: i64, sample: &Sample) -> Result<()>;

    /// Returns all samples for the given host, ascending by timestamp.
    fn samples_for(&self, host_id: i64) -> Result<Vec<Sample>>;
}
