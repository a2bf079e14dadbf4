//! Append-only CSV ledger store.
//!
//! The ledger is the durable state: rows are only ever appended, in ascending
//! timestamp order, and the last row's timestamp is the watermark the next
//! sync deduplicates against.

use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::models::{LedgerEntry, TransactionKind};

const HEADER: [&str; 5] = ["timestamp", "type", "amount", "asset", "note"];

/// Read the full ledger. A missing file is an empty ledger, not an error.
///
/// Any row that fails to parse is fatal: the watermark cannot be trusted if
/// the existing history cannot be fully read.
pub fn load(path: &Path) -> Result<Vec<LedgerEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open ledger {}", path.display()))?;

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2; // header is line 1
        let record =
            record.with_context(|| format!("Failed to read ledger line {line}"))?;
        if record.len() < 5 {
            continue;
        }

        let timestamp = DateTime::parse_from_rfc3339(&record[0])
            .with_context(|| format!("Ledger line {line}: bad timestamp {:?}", &record[0]))?
            .with_timezone(&Utc);
        let kind = TransactionKind::from_label(&record[1])
            .ok_or_else(|| anyhow!("Ledger line {line}: unknown type {:?}", &record[1]))?;
        let amount: Decimal = record[2]
            .parse()
            .with_context(|| format!("Ledger line {line}: bad amount {:?}", &record[2]))?;

        entries.push(LedgerEntry {
            timestamp,
            kind,
            amount,
            asset: record[3].to_string(),
            note: record[4].to_string(),
        });
    }

    Ok(entries)
}

/// Timestamp of the last persisted entry, the dedup watermark.
pub fn latest_timestamp(path: &Path) -> Result<Option<DateTime<Utc>>> {
    Ok(load(path)?.last().map(|entry| entry.timestamp))
}

/// Append already-sorted entries, creating the file (and its parent
/// directory) with a header row when it does not exist yet.
pub fn append(path: &Path, entries: &[LedgerEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open ledger {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if !exists {
        writer
            .write_record(HEADER)
            .context("Failed to write ledger header")?;
    }

    for entry in entries {
        writer
            .write_record(&[
                entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.kind.as_str().to_string(),
                format!("{:.8}", entry.amount),
                entry.asset.clone(),
                entry.note.clone(),
            ])
            .context("Failed to write ledger row")?;
    }

    writer.flush().context("Failed to flush ledger")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn entry(millis: i64, kind: TransactionKind, amount: Decimal) -> LedgerEntry {
        LedgerEntry {
            timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
            kind,
            amount,
            asset: "USDT".to_string(),
            note: "Trade (BTC-USDT-SWAP)".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        assert!(load(&path).unwrap().is_empty());
        assert!(latest_timestamp(&path).unwrap().is_none());
    }

    #[test]
    fn test_append_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("ledger.csv");

        let entries = vec![
            entry(1_700_000_000_000, TransactionKind::Deposit, dec!(50)),
            entry(1_700_000_100_123, TransactionKind::Pnl, dec!(-3.21)),
        ];
        append(&path, &entries).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, entries);
        assert_eq!(
            latest_timestamp(&path).unwrap().unwrap().timestamp_millis(),
            1_700_000_100_123
        );
    }

    #[test]
    fn test_append_is_append_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        append(&path, &[entry(100, TransactionKind::Deposit, dec!(1))]).unwrap();
        append(&path, &[entry(200, TransactionKind::Pnl, dec!(2))]).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].amount, dec!(1));
        assert_eq!(loaded[1].amount, dec!(2));

        // Exactly one header row.
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.matches("timestamp,type,amount,asset,note").count(), 1);
    }

    #[test]
    fn test_amounts_written_with_fixed_precision() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        append(&path, &[entry(100, TransactionKind::Withdrawal, dec!(-50))]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("WITHDRAWAL,-50.00000000,USDT"), "got: {raw}");
    }

    #[test]
    fn test_corrupt_row_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(
            &path,
            "timestamp,type,amount,asset,note\n2024-01-01T00:00:00.000Z,PNL,not-a-number,USDT,x\n",
        )
        .unwrap();

        assert!(load(&path).is_err());

        fs::write(
            &path,
            "timestamp,type,amount,asset,note\nyesterday,PNL,1.0,USDT,x\n",
        )
        .unwrap();
        assert!(latest_timestamp(&path).is_err());
    }

    #[test]
    fn test_empty_append_touches_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        append(&path, &[]).unwrap();
        assert!(!path.exists());
    }
}
