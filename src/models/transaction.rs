//! Ledger transaction model: the durable unit of record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Economic category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Pnl,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Pnl => "PNL",
        }
    }

    /// Parse the label stored in the ledger's `type` column.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "DEPOSIT" => Some(TransactionKind::Deposit),
            "WITHDRAWAL" => Some(TransactionKind::Withdrawal),
            "PNL" => Some(TransactionKind::Pnl),
            _ => None,
        }
    }
}

/// One reconciled transaction as it lives in the ledger.
///
/// The amount's sign is authoritative: deposits and winning trades are
/// positive, withdrawals and losing trades are negative. Entries are never
/// mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// When the underlying economic event happened
    pub timestamp: DateTime<Utc>,

    /// Deposit, withdrawal, or trading P&L
    pub kind: TransactionKind,

    /// Signed balance change
    pub amount: Decimal,

    /// Currency/asset code (e.g., "USDT")
    pub asset: String,

    /// Free-text note (instrument ids for trades, label for standalones)
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_round_trip() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::Pnl,
        ] {
            assert_eq!(TransactionKind::from_label(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert_eq!(TransactionKind::from_label("TRANSFER"), None);
        assert_eq!(TransactionKind::from_label("pnl"), None);
    }
}
