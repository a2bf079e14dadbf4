//! Filters aggregated entries against the ledger watermark.

use chrono::{DateTime, Utc};

use crate::models::LedgerEntry;

use super::config::WatermarkMode;

/// Keep only entries that belong in the ledger: non-zero amounts, newer than
/// the watermark, sorted ascending by timestamp ready to append.
///
/// A `None` watermark (empty or missing ledger) lets everything through.
pub fn reconcile(
    entries: Vec<LedgerEntry>,
    watermark: Option<DateTime<Utc>>,
    mode: WatermarkMode,
) -> Vec<LedgerEntry> {
    let mut fresh: Vec<LedgerEntry> = entries
        .into_iter()
        .filter(|entry| !entry.amount.is_zero())
        .filter(|entry| match watermark {
            None => true,
            Some(last) => match mode {
                WatermarkMode::Exclusive => entry.timestamp > last,
                WatermarkMode::Inclusive => entry.timestamp >= last,
            },
        })
        .collect();

    fresh.sort_by_key(|entry| entry.timestamp);
    fresh
}
