//! Folds raw bill fragments into logical ledger entries.
//!
//! OKX emits one bill row per leg of an order (fee, realized P&L, a funding
//! settlement tied to a position event, ...). Left unmerged, a single trade
//! would show up as several disconnected ledger lines with misleading
//! individual signs, so every fragment carrying an order id is folded into
//! one entry per order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::api::RawBill;
use crate::models::{LedgerEntry, TransactionKind};

/// In-progress aggregate for one order id.
struct OrderGroup {
    amount: Decimal,
    timestamp: DateTime<Utc>,
    asset: String,
    note: String,
}

impl OrderGroup {
    fn into_entry(self) -> LedgerEntry {
        // Anything tied to an order is trading P&L, whatever OKX labelled
        // the individual fragments.
        LedgerEntry {
            timestamp: self.timestamp,
            kind: TransactionKind::Pnl,
            amount: self.amount,
            asset: self.asset,
            note: self.note,
        }
    }
}

/// Collapse raw bills into logical entries: one per order id, plus one per
/// standalone (order-less) bill.
///
/// Grouped entries come out in first-seen order of their order id, followed
/// by standalones in input order, so output is deterministic regardless of
/// map iteration order.
pub fn aggregate_bills(bills: &[RawBill]) -> Result<Vec<LedgerEntry>> {
    let mut groups: HashMap<&str, OrderGroup> = HashMap::new();
    let mut order_ids: Vec<&str> = Vec::new();
    let mut standalone: Vec<LedgerEntry> = Vec::new();

    for bill in bills {
        let amount = bill.amount()?;
        let timestamp = bill.timestamp()?;

        if bill.ord_id.is_empty() {
            standalone.push(classify_standalone(bill, amount, timestamp));
            continue;
        }

        match groups.entry(&bill.ord_id) {
            Entry::Occupied(mut occupied) => {
                let group = occupied.get_mut();
                group.amount += amount;
                if timestamp > group.timestamp {
                    group.timestamp = timestamp;
                }
                if !group.note.contains(&bill.inst_id) {
                    group.note.push(' ');
                    group.note.push_str(&bill.inst_id);
                }
            }
            Entry::Vacant(vacant) => {
                order_ids.push(&bill.ord_id);
                vacant.insert(OrderGroup {
                    amount,
                    timestamp,
                    asset: bill.ccy.clone(),
                    note: format!("Trade ({})", bill.inst_id),
                });
            }
        }
    }

    let mut entries: Vec<LedgerEntry> = order_ids
        .into_iter()
        .filter_map(|ord_id| groups.remove(ord_id))
        .map(OrderGroup::into_entry)
        .collect();
    entries.extend(standalone);

    Ok(entries)
}

/// A bill with no order id is classified by its type code alone.
fn classify_standalone(bill: &RawBill, amount: Decimal, timestamp: DateTime<Utc>) -> LedgerEntry {
    let kind = match bill.bill_type.as_str() {
        "1" => TransactionKind::Deposit,
        "2" => TransactionKind::Withdrawal,
        _ => TransactionKind::Pnl,
    };

    let label = match bill.bill_type.as_str() {
        "1" => "Deposit",
        "2" => "Withdrawal",
        "8" => "Funding Fee",
        _ => "Auto Import",
    };
    let note = if bill.inst_id.is_empty() {
        label.to_string()
    } else {
        format!("{} ({})", label, bill.inst_id)
    };

    LedgerEntry {
        timestamp,
        kind,
        amount,
        asset: bill.ccy.clone(),
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bill(ord_id: &str, bill_type: &str, bal_chg: &str, ts: i64, inst_id: &str) -> RawBill {
        RawBill {
            bill_id: format!("bill-{ts}"),
            ts: ts.to_string(),
            bill_type: bill_type.to_string(),
            sub_type: String::new(),
            pnl: String::new(),
            bal_chg: bal_chg.to_string(),
            ccy: "USDT".to_string(),
            inst_id: inst_id.to_string(),
            ord_id: ord_id.to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_order_fragments_fold_into_one_entry() {
        let bills = vec![
            bill("ord-1", "8", "-1.5", 100, "BTC-USDT-SWAP"),
            bill("ord-1", "8", "5.25", 105, "BTC-USDT-SWAP"),
            bill("ord-1", "8", "-0.75", 103, "BTC-USDT-SWAP"),
        ];

        let entries = aggregate_bills(&bills).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.kind, TransactionKind::Pnl);
        assert_eq!(entry.amount, dec!(3.0));
        assert_eq!(entry.timestamp.timestamp_millis(), 105);
        assert_eq!(entry.asset, "USDT");
        assert_eq!(entry.note, "Trade (BTC-USDT-SWAP)");
    }

    #[test]
    fn test_note_does_not_duplicate_instruments() {
        let bills = vec![
            bill("ord-1", "8", "1", 100, "BTC-USDT-SWAP"),
            bill("ord-1", "8", "1", 101, "BTC-USDT-SWAP"),
            bill("ord-1", "8", "1", 102, "ETH-USDT-SWAP"),
        ];

        let entries = aggregate_bills(&bills).unwrap();
        assert_eq!(entries[0].note, "Trade (BTC-USDT-SWAP) ETH-USDT-SWAP");
    }

    #[test]
    fn test_fold_ignores_fragment_type_codes() {
        // A withdrawal-coded fragment still folds into its order's P&L entry.
        let bills = vec![
            bill("ord-1", "2", "-10", 100, "BTC-USDT"),
            bill("ord-1", "1", "12", 101, "BTC-USDT"),
        ];

        let entries = aggregate_bills(&bills).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::Pnl);
        assert_eq!(entries[0].amount, dec!(2));
    }

    #[test]
    fn test_standalone_classification() {
        let bills = vec![
            bill("", "1", "50", 100, ""),
            bill("", "2", "-20", 101, ""),
            bill("", "8", "-0.01", 102, "BTC-USDT-SWAP"),
            bill("", "7", "0.5", 103, ""),
        ];

        let entries = aggregate_bills(&bills).unwrap();
        assert_eq!(entries.len(), 4);

        assert_eq!(entries[0].kind, TransactionKind::Deposit);
        assert_eq!(entries[0].note, "Deposit");

        assert_eq!(entries[1].kind, TransactionKind::Withdrawal);
        assert_eq!(entries[1].note, "Withdrawal");

        assert_eq!(entries[2].kind, TransactionKind::Pnl);
        assert_eq!(entries[2].note, "Funding Fee (BTC-USDT-SWAP)");

        assert_eq!(entries[3].kind, TransactionKind::Pnl);
        assert_eq!(entries[3].note, "Auto Import");
    }

    #[test]
    fn test_grouped_output_order_is_first_seen() {
        let bills = vec![
            bill("ord-b", "8", "1", 100, "A"),
            bill("ord-a", "8", "2", 101, "B"),
            bill("ord-b", "8", "3", 102, "A"),
        ];

        let entries = aggregate_bills(&bills).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, dec!(4)); // ord-b, seen first
        assert_eq!(entries[1].amount, dec!(2)); // ord-a
    }

    #[test]
    fn test_malformed_amount_is_fatal() {
        let bills = vec![bill("", "1", "fifty", 100, "")];
        assert!(aggregate_bills(&bills).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_bills(&[]).unwrap().is_empty());
    }
}
