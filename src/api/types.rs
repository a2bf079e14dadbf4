//! Response types for the OKX account bills API.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Standard OKX response envelope: a string status code plus a data array.
#[derive(Debug, Clone, Deserialize)]
pub struct BillsResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<RawBill>,
}

/// One bill line from /api/v5/account/bills-archive.
///
/// OKX reports every numeric field as a string; parsing is deferred to the
/// aggregation pass so a page can be accumulated as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBill {
    pub bill_id: String,

    /// Millisecond epoch, as a string
    pub ts: String,

    /// Coarse bill type code ("1" deposit, "2" withdrawal, "8" funding fee, ...)
    #[serde(rename = "type", default)]
    pub bill_type: String,

    #[serde(default)]
    pub sub_type: String,

    #[serde(default)]
    pub pnl: String,

    /// Signed balance change
    #[serde(default)]
    pub bal_chg: String,

    /// Currency code
    #[serde(default)]
    pub ccy: String,

    /// Instrument id, empty for pure account events
    #[serde(default)]
    pub inst_id: String,

    /// Order id linking this fragment to a trade, empty for standalone events
    #[serde(default)]
    pub ord_id: String,

    #[serde(default)]
    pub notes: String,
}

impl RawBill {
    /// Signed balance change as a decimal.
    pub fn amount(&self) -> Result<Decimal> {
        self.bal_chg
            .parse()
            .with_context(|| format!("Bill {}: bad balance change {:?}", self.bill_id, self.bal_chg))
    }

    /// Event time from the millisecond-epoch string.
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        let millis: i64 = self
            .ts
            .parse()
            .with_context(|| format!("Bill {}: bad timestamp {:?}", self.bill_id, self.ts))?;
        Utc.timestamp_millis_opt(millis)
            .single()
            .with_context(|| format!("Bill {}: timestamp {} out of range", self.bill_id, millis))
    }
}
