//! Fleet polling: probe each configured host, parse its status line, and
//! append one sample per host to the store.
//!
//! Hosts are probed independently. A single host failing to answer or
//! answering in an unexpected format is recorded in the
//! [`CollectionReport`] and never aborts the batch.

pub mod parser;
pub mod probe;

use chrono::Utc;
use loadmon_common::types::{Host, Sample};
use loadmon_storage::SampleStore;
use probe::{Probe, ProbeError};

/// Why a single host produced no sample in this batch.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Store(#[from] loadmon_storage::error::StoreError),
}

/// One failed host within a batch.
#[derive(Debug)]
pub struct HostFailure {
    pub alias: String,
    pub error: CollectError,
}

/// Outcome of one polling batch, for operator visibility.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub succeeded: usize,
    pub failed: Vec<HostFailure>,
}

impl CollectionReport {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Polls every host once and appends one sample per successful probe,
/// tagged with the wall-clock time of the poll.
///
/// There is no retry: a failed probe stays failed for this batch and the
/// host is picked up again on the next run.
pub fn collect(
    probe: &dyn Probe,
    store: &dyn SampleStore,
    hosts: &[Host],
) -> CollectionReport {
    let mut report = CollectionReport::default();

    for host in hosts {
        match poll_host(probe, store, host) {
            Ok(sample) => {
                tracing::info!(
                    host = %host.alias,
                    users = sample.users,
                    load = sample.load,
                    "Sampled host"
                );
                report.succeeded += 1;
            }
            Err(error) => {
                tracing::warn!(host = %host.alias, error = %error, "Host poll failed");
                report.failed.push(HostFailure {
                    alias: host.alias.clone(),
                    error,
                });
            }
        }
    }

    report
}

fn poll_host(
    probe: &dyn Probe,
    store: &dyn SampleStore,
    host: &Host,
) -> Result<Sample, CollectError> {
    let output = probe.probe(host)?;
    let reading = parser::parse_uptime(&host.alias, &output)?;
    let sample = Sample::new(Utc::now(), reading.users, reading.load_one);
    store.append(host.id, &sample)?;
    Ok(sample)
}
