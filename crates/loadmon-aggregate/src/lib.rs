//! Daily percentile reduction of a sample stream.
//!
//! Converts a time-ordered, possibly irregular sequence of samples into
//! one point per calendar day: the 95th percentile of the day's load and
//! of the day's user count, each computed independently by the
//! nearest-rank rule. Pure and synchronous; safe to run concurrently for
//! different hosts with no coordination.

use chrono::NaiveDate;
use loadmon_common::types::Sample;
use serde::Serialize;
use std::collections::HashSet;

/// One day's percentile-reduced summary. Derived, never persisted;
/// recomputed on every aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub p95_load: f64,
    pub p95_users: f64,
}

/// Whole-series summary over the daily p95 loads, for the board table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p95: f64,
}

/// Errors from one aggregation call. Fatal to that call only; callers
/// handle them per host.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregateError {
    /// The input sequence was empty. Distinct from an empty success so
    /// consumers can render "not yet available" rather than a blank chart.
    #[error("no samples to aggregate")]
    NoData,

    /// The same calendar day appeared in two non-contiguous runs, meaning
    /// the input was not time-ordered. Failing here beats silently
    /// emitting duplicate or merged points.
    #[error("samples not time-ordered: day {0} appears twice non-contiguously")]
    UnsortedInput(NaiveDate),
}

pub type Result<T> = std::result::Result<T, AggregateError>;

/// Nearest-rank 95th percentile: sort ascending, take the value at
/// `ceil(n * 0.95) - 1`, clamped into `[0, n-1]`.
///
/// This is a selection rule, not an interpolation: for `n = 4` the index
/// is `ceil(3.8) - 1 = 3` (the maximum), for `n = 20` it is `18` (the
/// 19th of 20 sorted values). The `ceil` form is canonical; a `round`
/// variant changes output and is a bug, not an alternative.
fn p95_nearest_rank(values: &mut [f64]) -> f64 {
    debug_assert!(!values.is_empty());
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let rank = (n as f64 * 0.95).ceil() as usize;
    let index = rank.saturating_sub(1).min(n - 1);
    values[index]
}

fn reduce_window(date: NaiveDate, window: &[Sample]) -> DailyPoint {
    let mut loads: Vec<f64> = window.iter().map(|s| s.load).collect();
    let mut users: Vec<f64> = window.iter().map(|s| f64::from(s.users)).collect();
    DailyPoint {
        date,
        p95_load: p95_nearest_rank(&mut loads),
        p95_users: p95_nearest_rank(&mut users),
    }
}

/// Reduces a time-ordered sample sequence to one [`DailyPoint`] per
/// contiguous calendar day, in input order.
///
/// The calendar day is taken from each sample's encoded UTC timestamp,
/// not from wall-clock at read time. Within a day the samples need not be
/// sorted by value; the reduction sorts internally.
pub fn aggregate(samples: &[Sample]) -> Result<Vec<DailyPoint>> {
    if samples.is_empty() {
        return Err(AggregateError::NoData);
    }
    if samples.len() == 1 {
        // Percentile of a singleton set is the value itself; the window
        // sweep below would handle this, but the contract calls it out as
        // its own case and this keeps it from regressing.
        let s = &samples[0];
        return Ok(vec![reduce_window(
            s.timestamp.date_naive(),
            std::slice::from_ref(s),
        )]);
    }

    let mut points = Vec::new();
    let mut seen = HashSet::new();

    // Two-pointer sweep: [i, j) is a window of samples sharing the
    // calendar day of samples[i].
    let mut i = 0;
    while i < samples.len() {
        let day = samples[i].timestamp.date_naive();
        if !seen.insert(day) {
            return Err(AggregateError::UnsortedInput(day));
        }
        let mut j = i + 1;
        while j < samples.len() && samples[j].timestamp.date_naive() == day {
            j += 1;
        }
        points.push(reduce_window(day, &samples[i..j]));
        i = j;
    }

    Ok(points)
}

/// Summarizes the daily p95 loads into min/max/avg/p95 for the board
/// header. Fails with [`AggregateError::NoData`] on empty input.
pub fn summarize(points: &[DailyPoint]) -> Result<LoadSummary> {
    if points.is_empty() {
        return Err(AggregateError::NoData);
    }
    let mut loads: Vec<f64> = points.iter().map(|p| p.p95_load).collect();
    let min = loads.iter().copied().fold(f64::INFINITY, f64::min);
    let max = loads.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = loads.iter().sum::<f64>() / loads.len() as f64;
    Ok(LoadSummary {
        min,
        max,
        avg,
        p95: p95_nearest_rank(&mut loads),
    })
}
