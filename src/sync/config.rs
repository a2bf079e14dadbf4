//! Sync configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// How the reconciler treats a candidate whose timestamp equals the ledger's
/// last recorded timestamp.
///
/// `Exclusive` drops it (the historical dedup heuristic: equal timestamp
/// means "already recorded"). `Inclusive` keeps it, trading possible
/// duplicates for never losing a same-millisecond transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkMode {
    #[default]
    Exclusive,
    Inclusive,
}

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bills requested per page
    pub page_size: u32,

    /// Pause between successfully consumed pages
    pub page_throttle: Duration,

    /// Pause before retrying a rate-limited page
    pub rate_limit_cooldown: Duration,

    /// Consecutive rate-limit retries before giving up (None = retry forever)
    pub max_rate_limit_retries: Option<u32>,

    /// Dedup behaviour at the watermark boundary
    pub watermark_mode: WatermarkMode,

    /// Savings target used by the status report
    pub target: Decimal,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 100,                                  // OKX archive max
            page_throttle: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(5),
            max_rate_limit_retries: None,
            watermark_mode: WatermarkMode::Exclusive,
            target: dec!(120000),
        }
    }
}
