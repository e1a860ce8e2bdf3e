// src/market/polygon.rs
//! Polygon.io aggregates client. Requires `POLYGON_API_KEY`.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::market::clock::MarketClock;
use crate::market::{MarketDataProvider, PriceChange};

const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

pub struct PolygonProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    clock: MarketClock,
}

impl PolygonProvider {
    pub fn from_env(clock: MarketClock) -> Self {
        let api_key = std::env::var("POLYGON_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            warn!("POLYGON_API_KEY not set; polygon provider will report no data");
        }
        let base_url =
            std::env::var("POLYGON_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
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

    /// Polygon uses plain tickers for equities/ETFs and an `X:` prefix for
    /// crypto pairs.
    fn map_symbol(symbol: &str) -> String {
        match symbol {
            "BTC" => "X:BTCUSD".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<AggBar>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    /// Close price.
    c: f64,
    /// Bar end, unix milliseconds.
    t: i64,
}

#[async_trait::async_trait]
impl MarketDataProvider for PolygonProvider {
    async fn price_change(&self, symbol: &str, hours: u32) -> Result<Option<PriceChange>> {
        if self.api_key.is_empty() {
            return Ok(None);
        }

        let (start, end) = self.clock.session_window(Utc::now(), hours);
        let polygon_symbol = Self::map_symbol(symbol);
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/hour/{}/{}",
            self.base_url,
            polygon_symbol,
            start.timestamp_millis(),
            end.timestamp_millis()
        );
        debug!(symbol, %start, %end, "querying polygon aggregates");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("polygon request failed")?
            .error_for_status()
            .context("polygon returned an error status")?;

        let body: AggsResponse = resp.json().await.context("polygon response decode")?;
        if body.status != "OK" || body.results.is_empty() {
            debug!(symbol, status = %body.status, "no polygon data for window");
            return Ok(None);
        }

        let first = &body.results[0];
        let last = &body.results[body.results.len() - 1];
        let timestamp = end
            .timezone()
            .timestamp_millis_opt(last.t)
            .single()
            .unwrap_or(end);

        Ok(Some(PriceChange::new(symbol, last.c, first.c, timestamp)))
    }

    fn name(&self) -> &'static str {
        "polygon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_symbols_get_prefixed() {
        assert_eq!(PolygonProvider::map_symbol("BTC"), "X:BTCUSD");
        assert_eq!(PolygonProvider::map_symbol("SPY"), "SPY");
    }

    #[test]
    fn response_with_bars_decodes() {
        let raw = r#"{"status":"OK","results":[{"c":250.0,"t":1754316000000},{"c":252.3,"t":1754319600000}]}"#;
        let body: AggsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.status, "OK");
        assert_eq!(body.results.len(), 2);
        assert!((body.results[1].c - 252.3).abs() < 1e-9);
    }

    #[test]
    fn empty_results_are_tolerated() {
        let body: AggsResponse = serde_json::from_str(r#"{"status":"NOT_FOUND"}"#).unwrap();
        assert!(body.results.is_empty());
    }
}
