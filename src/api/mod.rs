//! OKX API client for fetching the account bills archive.

mod bills_client;
mod types;

pub use bills_client::{BillsClient, OkxCredentials};
pub use types::{BillsResponse, RawBill};
