// src/market/mod.rs
//! Market-data gateway: the `PriceChange` record and the provider contract.
//!
//! Providers return `Ok(None)` when no data exists for the requested window;
//! they never fabricate a zero-valued record on failure.

pub mod clock;
pub mod databento;
pub mod polygon;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::market::clock::MarketClock;

/// Price movement of one symbol over a lookback window. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub symbol: String,
    pub current_price: f64,
    pub previous_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: DateTime<FixedOffset>,
}

impl PriceChange {
    /// Derives `change` and `change_percent` so the invariants hold by
    /// construction: `change = current - previous`, and the percentage is 0
    /// when the previous price is not positive.
    pub fn new(
        symbol: impl Into<String>,
        current_price: f64,
        previous_price: f64,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        let change = current_price - previous_price;
        let change_percent = if previous_price > 0.0 {
            change / previous_price * 100.0
        } else {
            0.0
        };
        Self {
            symbol: symbol.into(),
            current_price,
            previous_price,
            change,
            change_percent,
            timestamp,
        }
    }
}

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Price change over the last `hours` of the latest complete session.
    /// `Ok(None)` means the provider has no data for the window.
    async fn price_change(&self, symbol: &str, hours: u32) -> Result<Option<PriceChange>>;
    fn name(&self) -> &'static str;
}

/// Build the configured provider. Unknown names fall back to Polygon with a
/// warning so the process still boots.
pub fn build_provider(cfg: &AppConfig) -> Arc<dyn MarketDataProvider> {
    let clock = MarketClock::from_config(&cfg.market_hours);
    match cfg.market_provider.as_str() {
        "databento" => Arc::new(databento::DatabentoProvider::from_env(clock)),
        "polygon" => Arc::new(polygon::PolygonProvider::from_env(clock)),
        other => {
            tracing::warn!(provider = other, "unknown market provider; using polygon");
            Arc::new(polygon::PolygonProvider::from_env(clock))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 8, 4, 16, 0, 0)
            .unwrap()
    }

    #[test]
    fn change_fields_hold_invariants() {
        let pc = PriceChange::new("TSLA", 252.30, 250.00, ts());
        assert!((pc.change - 2.30).abs() < 1e-9);
        assert!((pc.change_percent - 0.92).abs() < 1e-9);
    }

    #[test]
    fn zero_previous_price_yields_zero_percent() {
        let pc = PriceChange::new("X", 10.0, 0.0, ts());
        assert_eq!(pc.change, 10.0);
        assert_eq!(pc.change_percent, 0.0);
    }

    #[test]
    fn negative_moves_are_signed() {
        let pc = PriceChange::new("SPY", 99.0, 100.0, ts());
        assert!(pc.change < 0.0);
        assert!((pc.change_percent + 1.0).abs() < 1e-9);
    }
}
