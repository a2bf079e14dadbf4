//! Data models for ledger entries and portfolio state.

mod portfolio;
mod transaction;

pub use portfolio::PortfolioStatus;
pub use transaction::{LedgerEntry, TransactionKind};
