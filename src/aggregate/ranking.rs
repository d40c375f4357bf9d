//! Period selection and ranking for cross-region comparisons.

use std::collections::BTreeMap;

use crate::model::TopProducerRow;

/// Share of rows a period must strictly exceed to be chosen.
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 0.2;

/// Picks the reporting period to rank on.
///
/// Walks distinct periods newest first and returns the first one carried by
/// more than `threshold` of all rows. Regions report on different lags, so
/// this skips a fresh period that only a couple of regions have published.
/// Falls back to the newest period when none qualifies; `None` only for no
/// rows.
pub fn select_period(rows: &[TopProducerRow], threshold: f64) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.latest_period.as_str()).or_insert(0) += 1;
    }

    let total = rows.len() as f64;
    counts
        .iter()
        .rev()
        .find(|(_, count)| **count as f64 > total * threshold)
        .or_else(|| counts.iter().next_back())
        .map(|(period, _)| (*period).to_string())
}

/// Keeps rows for `period`, orders them by value descending, assigns
/// contiguous 1-based ranks and truncates to `limit`.
///
/// The sort is stable: equal values keep their input order.
pub fn rank_rows(rows: Vec<TopProducerRow>, period: &str, limit: usize) -> Vec<TopProducerRow> {
    let mut ranked: Vec<TopProducerRow> = rows
        .into_iter()
        .filter(|r| r.latest_period == period)
        .collect();
    ranked.sort_by(|a, b| b.latest_value.total_cmp(&a.latest_value));
    ranked.truncate(limit);
    for (i, row) in ranked.iter_mut().enumerate() {
        row.rank = Some(i + 1);
    }
    ranked
}
