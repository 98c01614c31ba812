//! # live — current traded price from the NSE quote API
//!
//! The quote endpoint only answers with the session cookies that the home
//! page sets, so every lookup primes the cookie jar first.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::bhavcopy::fetcher::{ACCEPT_LANGUAGE, BROWSER_USER_AGENT};
use crate::models::LivePrice;

const QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn live_price(&self, symbol: &str) -> anyhow::Result<LivePrice>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    price_info: PriceInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceInfo {
    last_price: f64,
}

pub struct NseQuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl NseQuoteClient {
    /// Builds its own client with a cookie store; the shared one has none.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(BROWSER_USER_AGENT)
            .timeout(QUOTE_TIMEOUT)
            .build()
            .context("Failed to build quote HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/api/quote-equity?symbol={}", self.base_url, encode_symbol(symbol))
    }
}

#[async_trait]
impl QuoteSource for NseQuoteClient {
    async fn live_price(&self, symbol: &str) -> anyhow::Result<LivePrice> {
        self.client
            .get(&self.base_url)
            .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await
            .context("NSE home page unreachable")?;

        let url = self.quote_url(symbol);
        debug!(url = %url, "Fetching live quote");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await
            .context("NSE quote API unreachable")?;

        if !resp.status().is_success() {
            anyhow::bail!("NSE quote API returned HTTP {}", resp.status());
        }

        let quote: QuoteResponse = resp.json().await.context("Failed to parse quote response")?;
        parse_quote(symbol, quote)
    }
}

fn parse_quote(symbol: &str, quote: QuoteResponse) -> anyhow::Result<LivePrice> {
    let price = quote.price_info.last_price;
    if !price.is_finite() || price <= 0.0 {
        anyhow::bail!("NSE quote has invalid lastPrice {price}");
    }
    Ok(LivePrice {
        symbol: symbol.to_string(),
        current_price: price,
        fetched_at: Utc::now(),
    })
}

/// Symbols like `M&M` or `BAJAJ-AUTO` must survive the query string.
fn encode_symbol(symbol: &str) -> String {
    symbol
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
