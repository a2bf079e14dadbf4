//! Authenticated OKX REST client for paginated bills-archive fetching.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::sync::SyncConfig;

use super::types::{BillsResponse, RawBill};

const OKX_API_BASE: &str = "https://www.okx.com";
const BILLS_ARCHIVE_PATH: &str = "/api/v5/account/bills-archive";

/// OKX business code signalling "too many requests".
const RATE_LIMIT_CODE: &str = "50011";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type HmacSha256 = Hmac<Sha256>;

/// API credentials, normally loaded from config.json.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OkxCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
    #[serde(rename = "is_simulated", default)]
    pub simulated: bool,
}

impl OkxCredentials {
    /// Load credentials from a JSON file, letting `OKX_API_KEY`,
    /// `OKX_SECRET_KEY`, and `OKX_PASSPHRASE` env vars override file values.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        let mut creds: OkxCredentials = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse credentials file {}", path.display()))?;

        if let Ok(key) = std::env::var("OKX_API_KEY") {
            creds.api_key = key;
        }
        if let Ok(secret) = std::env::var("OKX_SECRET_KEY") {
            creds.secret_key = secret;
        }
        if let Ok(passphrase) = std::env::var("OKX_PASSPHRASE") {
            creds.passphrase = passphrase;
        }

        Ok(creds)
    }
}

/// Base64 HMAC-SHA256 over `timestamp + method + path + query`, the OKX
/// request signature.
pub(crate) fn sign_request(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    query: &str,
) -> Result<String> {
    let message = format!("{timestamp}{method}{path}{query}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| anyhow!("Invalid HMAC secret key"))?;
    mac.update(message.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Client for the OKX account bills archive.
pub struct BillsClient {
    client: Client,
    base_url: String,
    credentials: OkxCredentials,
    config: SyncConfig,
}

impl BillsClient {
    /// Create a new client against the production OKX endpoint.
    pub fn new(credentials: OkxCredentials, config: SyncConfig) -> Result<Self> {
        Self::with_base_url(OKX_API_BASE.to_string(), credentials, config)
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        base_url: String,
        credentials: OkxCredentials,
        config: SyncConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
            config,
        })
    }

    /// Build a signed GET request for `path` + `query` (query includes the
    /// leading `?`; it is part of the signed message).
    fn signed_get(&self, path: &str, query: &str) -> Result<reqwest::RequestBuilder> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let signature = sign_request(&self.credentials.secret_key, &timestamp, "GET", path, query)?;

        let mut request = self
            .client
            .get(format!("{}{}{}", self.base_url, path, query))
            .header("OK-ACCESS-KEY", &self.credentials.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.credentials.passphrase);

        if self.credentials.simulated {
            request = request.header("x-simulated-trading", "1");
        }

        Ok(request)
    }

    /// Fetch the complete bills archive, one page at a time.
    ///
    /// The cursor never moves on a rate-limited page: the same page is
    /// re-requested after a cooldown, so no page is skipped or duplicated.
    /// Any other failure aborts the fetch.
    pub async fn fetch_all_bills(&self) -> Result<Vec<RawBill>> {
        let page_size = self.config.page_size as usize;
        let mut all_bills = Vec::new();
        let mut cursor = String::new();
        let mut page = 1usize;
        let mut rate_limit_attempts = 0u32;

        loop {
            let mut query = format!("?limit={}", self.config.page_size);
            if !cursor.is_empty() {
                query.push_str("&after=");
                query.push_str(&cursor);
            }

            debug!(url = %format!("{}{}{}", self.base_url, BILLS_ARCHIVE_PATH, query), "Fetching bills page");

            let response = self
                .signed_get(BILLS_ARCHIVE_PATH, &query)?
                .send()
                .await
                .context("Failed to reach OKX bills archive")?;

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read bills response body")?;

            if !status.is_success() {
                if status == StatusCode::TOO_MANY_REQUESTS || body.contains(RATE_LIMIT_CODE) {
                    self.rate_limit_pause(page, &mut rate_limit_attempts).await?;
                    continue;
                }
                bail!("Bills request failed: {} - {}", status, body);
            }

            let envelope: BillsResponse =
                serde_json::from_str(&body).context("Failed to parse bills response")?;

            if envelope.code != "0" {
                if envelope.code == RATE_LIMIT_CODE {
                    self.rate_limit_pause(page, &mut rate_limit_attempts).await?;
                    continue;
                }
                bail!("OKX error {}: {}", envelope.code, envelope.msg);
            }

            rate_limit_attempts = 0;

            if envelope.data.is_empty() {
                break;
            }

            // The next page starts after the last bill we have seen.
            cursor = envelope
                .data
                .last()
                .map(|bill| bill.bill_id.clone())
                .unwrap_or_default();

            let fetched = envelope.data.len();
            info!(page, bills = fetched, "Fetched bills page");
            all_bills.extend(envelope.data);

            if fetched < page_size {
                break;
            }

            page += 1;
            tokio::time::sleep(self.config.page_throttle).await;
        }

        Ok(all_bills)
    }

    async fn rate_limit_pause(&self, page: usize, attempts: &mut u32) -> Result<()> {
        *attempts += 1;
        if let Some(max) = self.config.max_rate_limit_retries {
            if *attempts > max {
                bail!("Rate limited {max} times in a row on page {page}, giving up");
            }
        }

        warn!(
            page,
            attempt = *attempts,
            cooldown_ms = self.config.rate_limit_cooldown.as_millis() as u64,
            "Rate limited, pausing before retrying page"
        );
        tokio::time::sleep(self.config.rate_limit_cooldown).await;
        Ok(())
    }
}
