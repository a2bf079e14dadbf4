//! Portfolio metrics derived from the persisted ledger.

mod calculator;

pub use calculator::PortfolioCalculator;
