// src/market/databento.rs
//! Databento historical timeseries client. Requires `DATABENTO_API_KEY`.
//!
//! Uses the JSON encoding of `timeseries.get_range` with the hourly OHLCV
//! schema; records arrive one JSON object per line with fixed-point prices
//! (1e-9 scale).

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::market::clock::MarketClock;
use crate::market::{MarketDataProvider, PriceChange};

const DEFAULT_BASE_URL: &str = "https://hist.databento.com";
const PRICE_SCALE: f64 = 1e-9;

pub struct DatabentoProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    clock: MarketClock,
}

impl DatabentoProvider {
    pub fn from_env(clock: MarketClock) -> Self {
        let api_key = std::env::var("DATABENTO_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            warn!("DATABENTO_API_KEY not set; databento provider will report no data");
        }
        let base_url =
            std::env::var("DATABENTO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            base_url,
            clock,
        }
    }

    fn map_symbol(symbol: &str) -> String {
        match symbol {
            "BTC" => "BTCUSD".to_string(),
            other => other.to_string(),
        }
    }

    fn dataset(_symbol: &str) -> &'static str {
        "DBEQ.BASIC"
    }

    /// Close prices in record order from the line-delimited JSON body.
    fn parse_closes(body: &str) -> Vec<f64> {
        body.lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                let v: serde_json::Value = serde_json::from_str(line).ok()?;
                fixed_point_field(&v, "close")
            })
            .collect()
    }
}

/// Databento serializes fixed-point prices either as integer strings or raw
/// integers depending on encoding options; accept both.
fn fixed_point_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    let field = v.get(key)?;
    let raw = match field {
        serde_json::Value::String(s) => s.parse::<i64>().ok()?,
        serde_json::Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    Some(raw as f64 * PRICE_SCALE)
}

#[async_trait::async_trait]
impl MarketDataProvider for DatabentoProvider {
    async fn price_change(&self, symbol: &str, hours: u32) -> Result<Option<PriceChange>> {
        if self.api_key.is_empty() {
            return Ok(None);
        }

        let (start, end) = self.clock.session_window(Utc::now(), hours);
        let url = format!("{}/v0/timeseries.get_range", self.base_url);
        debug!(symbol, %start, %end, "querying databento ohlcv-1h");

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Option::<&str>::None)
            .query(&[
                ("dataset", Self::dataset(symbol)),
                ("symbols", Self::map_symbol(symbol).as_str()),
                ("schema", "ohlcv-1h"),
                ("start", start.to_rfc3339().as_str()),
                ("end", end.to_rfc3339().as_str()),
                ("encoding", "json"),
            ])
            .send()
            .await
            .context("databento request failed")?
            .error_for_status()
            .context("databento returned an error status")?;

        let body = resp.text().await.context("databento response read")?;
        let closes = Self::parse_closes(&body);
        if closes.is_empty() {
            debug!(symbol, "no databento data for window");
            return Ok(None);
        }

        let first = closes[0];
        let last = closes[closes.len() - 1];
        Ok(Some(PriceChange::new(symbol, last, first, end)))
    }

    fn name(&self) -> &'static str {
        "databento"
    }
}
