//! CSV export of stored samples, one file per host per run.
//!
//! A pure projection: values are written exactly as stored, ordered
//! ascending by timestamp. Hosts with no samples still produce a
//! header-only file so downstream consumers can tell "empty" from
//! "missing".

use crate::error::Result;
use crate::SampleStore;
use chrono::Utc;
use loadmon_common::records;
use loadmon_common::types::{Host, Sample};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Reads all samples for one host, ascending by timestamp.
pub fn export(store: &dyn SampleStore, host: &Host) -> Result<Vec<Sample>> {
    store.samples_for(host.id)
}

/// Filename convention: `<alias>-<YYYY-MM>.csv`, the period suffix taken
/// from the current month.
pub fn export_filename(host: &Host) -> String {
    format!("{}-{}.csv", host.alias, Utc::now().format("%Y-%m"))
}

/// Exports every registered host into `dir`. Returns the written paths.
pub fn export_all(store: &dyn SampleStore, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for host in store.hosts()? {
        let samples = export(store, &host)?;
        let path = dir.join(export_filename(&host));
        let file = File::create(&path)?;
        records::write_records(file, &samples)?;
        tracing::info!(host = %host.alias, rows = samples.len(), path = %path.display(), "Exported samples");
        written.push(path);
    }
    Ok(written)
}
