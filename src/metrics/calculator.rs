//! Calculator for portfolio health: balance, harvested capital, win rate.

use rust_decimal::Decimal;

use crate::models::{LedgerEntry, PortfolioStatus, TransactionKind};

/// Computes a `PortfolioStatus` by walking the ledger once.
pub struct PortfolioCalculator;

impl PortfolioCalculator {
    pub fn calculate(entries: &[LedgerEntry], target: Decimal) -> PortfolioStatus {
        let mut status = PortfolioStatus {
            target,
            ..Default::default()
        };

        for entry in entries {
            // The sign already encodes the balance effect for every kind.
            status.current_balance += entry.amount;

            match entry.kind {
                TransactionKind::Deposit => {
                    status.initial_capital += entry.amount;
                }
                TransactionKind::Withdrawal => {
                    // Stored negative; harvested is reported as a positive figure.
                    status.total_harvested += entry.amount.abs();
                }
                TransactionKind::Pnl => {
                    status.total_pnl += entry.amount;
                    if entry.amount > Decimal::ZERO {
                        status.win_count += 1;
                    } else if entry.amount < Decimal::ZERO {
                        status.loss_count += 1;
                    }
                }
            }
        }

        status
    }
}
