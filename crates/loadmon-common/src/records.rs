//! CSV codec for the exported sample table.
//!
//! One file per host per export run: a `time,users,load` header followed by
//! one row per sample, timestamps in RFC 3339. The reader is the inverse of
//! the writer and is also used on remotely fetched files, so it is strict
//! about field count and types but tolerant of a trailing blank line.

use crate::types::Sample;
use chrono::{DateTime, Utc};
use std::io::{Read, Write};

pub const HEADER: [&str; 3] = ["time", "users", "load"];

/// Errors produced while encoding or decoding the sample table.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: invalid timestamp '{value}': {source}")]
    Timestamp {
        row: usize,
        value: String,
        source: chrono::ParseError,
    },

    #[error("row {row}: invalid {field} '{value}'")]
    Field {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: expected {expected} fields, got {got}")]
    FieldCount {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("expected header '{expected}', got '{got}'")]
    Header { expected: String, got: String },
}

pub type Result<T> = std::result::Result<T, RecordError>;

/// Writes the header and one row per sample. Zero samples produce a
/// header-only body rather than an error.
pub fn write_records<W: Write>(writer: W, samples: &[Sample]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(HEADER)?;
    for sample in samples {
        w.write_record([
            sample.timestamp.to_rfc3339().as_str(),
            sample.users.to_string().as_str(),
            sample.load.to_string().as_str(),
        ])?;
    }
    w.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Parses a sample table produced by [`write_records`].
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Sample>> {
    let mut r = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    // A file whose first row is not the expected header is not a sample
    // table; treating that row as a header would drop a sample.
    let headers = r.headers()?;
    if headers.iter().ne(HEADER) {
        return Err(RecordError::Header {
            expected: HEADER.join(","),
            got: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut samples = Vec::new();
    for (i, record) in r.records().enumerate() {
        let record = record?;
        // Row numbers are 1-based and skip the header.
        let row = i + 1;
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        if record.len() != HEADER.len() {
            return Err(RecordError::FieldCount {
                row,
                expected: HEADER.len(),
                got: record.len(),
            });
        }
        let timestamp: DateTime<Utc> = record[0]
            .parse::<DateTime<chrono::FixedOffset>>()
            .map(|t| t.with_timezone(&Utc))
            .map_err(|source| RecordError::Timestamp {
                row,
                value: record[0].to_string(),
                source,
            })?;
        let users: u32 = record[1].parse().map_err(|_| RecordError::Field {
            row,
            field: "users",
            value: record[1].to_string(),
        })?;
        let load: f64 = record[2].parse().map_err(|_| RecordError::Field {
            row,
            field: "load",
            value: record[2].to_string(),
        })?;
        samples.push(Sample {
            timestamp,
            users,
            load,
        });
    }
    Ok(samples)
}

/// Decodes a table held in memory, e.g. the body of a fetched file.
pub fn read_records_str(body: &str) -> Result<Vec<Sample>> {
    read_records(body.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(h: u32, users: u32, load: f64) -> Sample {
        Sample::new(Utc.with_ymd_and_hms(2023, 4, 2, h, 0, 0).unwrap(), users, load)
    }

    #[test]
    fn writes_header_for_empty_input() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[]).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.trim_end(), "time,users,load");
    }

    #[test]
    fn round_trips_samples() {
        let samples = vec![sample(1, 8, 3.71), sample(2, 3, 0.25)];
        let mut buf = Vec::new();
        write_records(&mut buf, &samples).unwrap();
        let back = read_records(buf.as_slice()).unwrap();
        assert_eq!(back, samples);
    }

    #[test]
    fn tolerates_trailing_blank_line() {
        let body = "time,users,load\n2023-04-02T01:00:00+00:00,8,3.71\n\n";
        let samples = read_records_str(body).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].users, 8);
    }

    #[test]
    fn rejects_headerless_input() {
        let body = "2023-04-02T01:00:00+00:00,8,3.71\n2023-04-02T02:00:00+00:00,3,0.25\n";
        let err = read_records_str(body).unwrap_err();
        assert!(matches!(err, RecordError::Header { .. }));
    }

    #[test]
    fn rejects_non_numeric_users() {
        let body = "time,users,load\n2023-04-02T01:00:00+00:00,eight,3.71\n";
        let err = read_records_str(body).unwrap_err();
        assert!(matches!(err, RecordError::Field { field: "users", .. }));
    }

    #[test]
    fn rejects_short_rows() {
        let body = "time,users,load\n2023-04-02T01:00:00+00:00,8\n";
        let err = read_records_str(body).unwrap_err();
        assert!(matches!(
            err,
            RecordError::FieldCount {
                expected: 3,
                got: 2,
                ..
            }
        ));
    }
}
