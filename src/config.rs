// src/config.rs
//! Application configuration: TOML file + environment overrides.
//!
//! Missing files and missing secrets are startup warnings, never fatal;
//! the service still serves health/status and individual pipeline calls
//! degrade per their own contracts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";

pub const DEFAULT_CONTEXT_PATH: &str = "background.md";
pub const DEFAULT_CONTEXT: &str =
    "Monitor US financial markets for significant price movements.";

fn default_tickers() -> Vec<String> {
    ["SPY", "QQQ", "GLD", "BTC"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_threshold() -> f64 {
    0.005
}
fn default_poll_interval_secs() -> u64 {
    3_600
}
fn default_error_backoff_secs() -> u64 {
    60
}
fn default_market_provider() -> String {
    "polygon".to_string()
}
fn default_context_path() -> String {
    DEFAULT_CONTEXT_PATH.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tickers")]
    pub monitored_tickers: Vec<String>,
    /// Fractional move threshold; 0.005 means 0.5%.
    #[serde(default = "default_threshold")]
    pub price_change_threshold: f64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
    /// "polygon" | "databento"
    #[serde(default = "default_market_provider")]
    pub market_provider: String,
    #[serde(default = "default_context_path")]
    pub context_path: String,
    #[serde(default)]
    pub market_hours: MarketHoursConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitored_tickers: default_tickers(),
            price_change_threshold: default_threshold(),
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            market_provider: default_market_provider(),
            context_path: default_context_path(),
            market_hours: MarketHoursConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

/// Trading window in exchange-local time over a fixed UTC offset.
/// The default is US Eastern during DST; the offset is a config change,
/// not a code change, when the clocks shift.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MarketHoursConfig {
    pub utc_offset_hours: i32,
    pub open_hour: u32,
    pub open_minute: u32,
    pub close_hour: u32,
}

impl Default for MarketHoursConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: -4,
            open_hour: 9,
            open_minute: 30,
            close_hour: 16,
        }
    }
}

fn default_llm_base_url() -> String {
    "https://space.ai-builders.com/backend/v1".to_string()
}
fn default_llm_model() -> String {
    "supermind-agent-v1".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
        }
    }
}

impl AppConfig {
    /// Load from `$MONITOR_CONFIG_PATH` or `config/monitor.toml`, then apply
    /// environment overrides. An absent or unparsable file falls back to
    /// defaults with a warning.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from(&path);
        cfg.apply_env_overrides();
        cfg.sanitize();
        cfg
    }

    fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<AppConfig>(&s) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config parse failed; using defaults");
                    AppConfig::default()
                }
            },
            Err(_) => {
                warn!(path = %path.display(), "config file not found; using defaults");
                AppConfig::default()
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("MONITORED_TICKERS") {
            let tickers: Vec<String> = raw
                .split(',')
                .map(|t| t.trim().to_ascii_uppercase())
                .filter(|t| !t.is_empty())
                .collect();
            if !tickers.is_empty() {
                self.monitored_tickers = tickers;
            }
        }
        if let Some(t) = parse_env::<f64>("PRICE_CHANGE_THRESHOLD") {
            self.price_change_threshold = t;
        }
        if let Some(s) = parse_env::<u64>("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = s;
        }
        if let Ok(p) = std::env::var("MARKET_PROVIDER") {
            if !p.trim().is_empty() {
                self.market_provider = p.trim().to_ascii_lowercase();
            }
        }
        if let Some(h) = parse_env::<i32>("MARKET_UTC_OFFSET_HOURS") {
            self.market_hours.utc_offset_hours = h;
        }
    }

    fn sanitize(&mut self) {
        if !self.price_change_threshold.is_finite() || self.price_change_threshold < 0.0 {
            self.price_change_threshold = default_threshold();
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.error_backoff_secs == 0 {
            self.error_backoff_secs = default_error_backoff_secs();
        }
    }
}

/// Load the strategic-context document. Absence degrades to a generic
/// default string rather than failing startup.
pub fn load_strategic_context(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(s) if !s.trim().is_empty() => s,
        Ok(_) => {
            warn!(path, "strategic context file is empty; using default");
            DEFAULT_CONTEXT.to_string()
        }
        Err(e) => {
            warn!(path, error = %e, "could not load strategic context; using default");
            DEFAULT_CONTEXT.to_string()
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.monitored_tickers, vec!["SPY", "QQQ", "GLD", "BTC"]);
        assert!((cfg.price_change_threshold - 0.005).abs() < 1e-12);
        assert_eq!(cfg.poll_interval_secs, 3_600);
        assert_eq!(cfg.error_backoff_secs, 60);
        assert_eq!(cfg.market_provider, "polygon");
        assert_eq!(cfg.market_hours.utc_offset_hours, -4);
    }

    #[test]
    fn toml_partial_file_keeps_defaults_for_rest() {
        let cfg: AppConfig = toml::from_str(
            r#"
monitored_tickers = ["TSLA"]
price_change_threshold = 0.01

[market_hours]
utc_offset_hours = -5
open_hour = 9
open_minute = 30
close_hour = 16
"#,
        )
        .unwrap();
        assert_eq!(cfg.monitored_tickers, vec!["TSLA"]);
        assert!((cfg.price_change_threshold - 0.01).abs() < 1e-12);
        // untouched sections fall back
        assert_eq!(cfg.poll_interval_secs, 3_600);
        assert_eq!(cfg.market_hours.utc_offset_hours, -5);
        assert_eq!(cfg.llm.model, default_llm_model());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_beat_file_values() {
        std::env::set_var("MONITORED_TICKERS", "tsla, spy");
        std::env::set_var("PRICE_CHANGE_THRESHOLD", "0.02");
        std::env::set_var("MARKET_PROVIDER", "Databento");

        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.monitored_tickers, vec!["TSLA", "SPY"]);
        assert!((cfg.price_change_threshold - 0.02).abs() < 1e-12);
        assert_eq!(cfg.market_provider, "databento");

        std::env::remove_var("MONITORED_TICKERS");
        std::env::remove_var("PRICE_CHANGE_THRESHOLD");
        std::env::remove_var("MARKET_PROVIDER");
    }

    #[test]
    fn sanitize_rejects_nonsense() {
        let mut cfg = AppConfig::default();
        cfg.price_change_threshold = f64::NAN;
        cfg.poll_interval_secs = 0;
        cfg.sanitize();
        assert!((cfg.price_change_threshold - 0.005).abs() < 1e-12);
        assert_eq!(cfg.poll_interval_secs, 3_600);
    }

    #[serial_test::serial]
    #[test]
    fn missing_context_file_degrades_to_default() {
        let ctx = load_strategic_context("does/not/exist.md");
        assert_eq!(ctx, DEFAULT_CONTEXT);
    }
}
