//! Sync pipeline: aggregation of raw bills and reconciliation against the
//! persisted ledger.

mod aggregator;
mod config;
mod reconciler;

pub use aggregator::aggregate_bills;
pub use config::{SyncConfig, WatermarkMode};
pub use reconciler::reconcile;
