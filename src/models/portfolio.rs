//! Portfolio summary derived from the ledger.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Aggregate view of the account's health, computed by walking the ledger.
#[derive(Debug, Clone, Default)]
pub struct PortfolioStatus {
    /// Sum of all deposits (seed capital)
    pub initial_capital: Decimal,

    /// Net balance after every recorded entry
    pub current_balance: Decimal,

    /// Cumulative trading P&L
    pub total_pnl: Decimal,

    /// Cumulative withdrawals, as a positive figure
    pub total_harvested: Decimal,

    /// Number of profitable trades
    pub win_count: u32,

    /// Number of losing trades
    pub loss_count: u32,

    /// Savings target the balance is measured against
    pub target: Decimal,
}

impl PortfolioStatus {
    /// Progress toward the savings target, in percent.
    pub fn progress(&self) -> f64 {
        if self.target.is_zero() {
            return 0.0;
        }
        let balance = self.current_balance.to_f64().unwrap_or(0.0);
        let target = self.target.to_f64().unwrap_or(1.0);
        balance / target * 100.0
    }

    /// Fraction of trades that were profitable, in percent.
    pub fn win_rate(&self) -> f64 {
        let total = self.win_count + self.loss_count;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.win_count) / f64::from(total) * 100.0
    }
}
