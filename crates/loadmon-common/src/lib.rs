//! Shared types for the loadmon pipeline.
//!
//! [`types`] holds the data model used by every other crate (hosts and
//! timestamped samples). [`records`] is the CSV codec for the exported
//! tabular format, used by both the exporter and the remote fetch layer.

pub mod records;
pub mod types;
