//! Strict parsing of `uptime` output.
//!
//! The probe output is matched against fixed patterns extracting the
//! logged-in user count and the three load averages. Anything that does
//! not match produces [`ProbeError::Parse`]; there is no partial reading.

use crate::probe::ProbeError;
use once_cell::sync::Lazy;
use regex::Regex;

static LOAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"load average: (?P<one>[\d.]+), (?P<five>[\d.]+), (?P<fifteen>[\d.]+)")
        .expect("load average pattern is valid")
});

static USERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<users>\d+) users?\b").expect("users pattern is valid"));

/// One parsed status line: user count plus the load-average triple.
#[derive(Debug, Clone, PartialEq)]
pub struct UptimeReading {
    pub users: u32,
    pub load_one: f64,
    pub load_five: f64,
    pub load_fifteen: f64,
}

/// Parses one line of `uptime` output. `host` is used for error context
/// only.
pub fn parse_uptime(host: &str, output: &str) -> Result<UptimeReading, ProbeError> {
    let parse_err = || ProbeError::Parse {
        host: host.to_string(),
        output: output.to_string(),
    };

    let load = LOAD_RE.captures(output).ok_or_else(parse_err)?;
    let users = USERS_RE.captures(output).ok_or_else(parse_err)?;

    // The numeric groups only admit digits and dots, so a parse failure
    // here means a value like "3.7.1" slipped through the pattern.
    let field = |caps: &regex::Captures<'_>, name: &str| -> Result<f64, ProbeError> {
        caps.name(name)
            .expect("group exists in pattern")
            .as_str()
            .parse()
            .map_err(|_| parse_err())
    };

    Ok(UptimeReading {
        users: users["users"].parse().map_err(|_| parse_err())?,
        load_one: field(&load, "one")?,
        load_five: field(&load, "five")?,
        load_fifteen: field(&load, "fifteen")?,
    })
}
