// src/monitor.rs
//! Monitoring orchestrator: polls tracked symbols, decides significance, and
//! drives retrieval -> filter -> impact analysis for each significant move.
//!
//! A gateway failure is "no record" for that symbol, never a zero-change
//! result. No cycle failure aborts the process; an errored cycle retries
//! after a short backoff instead of the full period.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

use crate::analysis::{impact, Analysis};
use crate::config::AppConfig;
use crate::history::RecentAnalyses;
use crate::llm::DynLlmClient;
use crate::market::clock::MarketClock;
use crate::market::{MarketDataProvider, PriceChange};
use crate::news::filter::NewsFilter;
use crate::news::search::search_news;

/// Lookback window for every poll, in hours.
const LOOKBACK_HOURS: u32 = 1;
/// Candidates requested from retrieval per significant move.
const SEARCH_MAX_RESULTS: usize = 15;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_cycles_total", "Completed polling cycles.");
        describe_counter!(
            "monitor_significant_moves_total",
            "Price moves at or above the significance threshold."
        );
        describe_counter!(
            "market_provider_errors_total",
            "Market-data provider fetch errors (treated as absence)."
        );
        describe_counter!("news_search_errors_total", "News retrieval provider errors.");
        describe_counter!(
            "news_parse_regex_fallback_total",
            "News responses that needed object-literal extraction."
        );
        describe_counter!(
            "news_parse_url_fallback_total",
            "News responses that needed the bare-URL fallback."
        );
        describe_counter!(
            "news_filtered_out_total",
            "Candidates dropped by the keyword stage."
        );
        describe_counter!(
            "news_score_errors_total",
            "Relevance scoring calls that degraded to the neutral default."
        );
        describe_counter!("analyses_completed_total", "Impact analyses completed.");
        describe_counter!(
            "analysis_errors_total",
            "Impact analyses that returned an error marker."
        );
        describe_gauge!(
            "monitor_last_cycle_ts",
            "Unix ts when the monitoring loop last completed a cycle."
        );
    });
}

/// Boundary equality counts as significant.
pub fn is_significant(change_percent: f64, threshold: f64) -> bool {
    change_percent.abs() >= threshold * 100.0
}

pub struct MonitoringService {
    cfg: AppConfig,
    context: String,
    market: Arc<dyn MarketDataProvider>,
    llm: DynLlmClient,
    filter: NewsFilter,
    clock: MarketClock,
    history: Arc<RecentAnalyses>,
}

impl MonitoringService {
    pub fn new(
        cfg: AppConfig,
        context: String,
        market: Arc<dyn MarketDataProvider>,
        llm: DynLlmClient,
        history: Arc<RecentAnalyses>,
    ) -> Self {
        ensure_metrics_described();
        let clock = MarketClock::from_config(&cfg.market_hours);
        let filter = NewsFilter::new(llm.clone());
        Self {
            cfg,
            context,
            market,
            llm,
            filter,
            clock,
            history,
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.cfg.monitored_tickers
    }

    /// Check all tracked symbols; return the moves at or above the threshold.
    /// Symbols with no data (or a failing provider) are skipped, not zeroed.
    pub async fn poll_once(&self) -> Vec<PriceChange> {
        let mut significant = Vec::new();
        for ticker in &self.cfg.monitored_tickers {
            match self.market.price_change(ticker, LOOKBACK_HOURS).await {
                Ok(Some(pc)) => {
                    if is_significant(pc.change_percent, self.cfg.price_change_threshold) {
                        info!(
                            ticker = %ticker,
                            change_percent = pc.change_percent,
                            "significant movement detected"
                        );
                        counter!("monitor_significant_moves_total").increment(1);
                        significant.push(pc);
                    }
                }
                Ok(None) => {
                    info!(ticker = %ticker, provider = self.market.name(), "no price data");
                }
                Err(e) => {
                    warn!(ticker = %ticker, provider = self.market.name(), error = %e, "price check failed");
                    counter!("market_provider_errors_total").increment(1);
                }
            }
        }
        significant
    }

    /// Full pipeline for one move: retrieval -> filter -> impact analysis.
    /// The completed analysis is inserted at the head of the history store.
    pub async fn analyze_movement(&self, price_change: &PriceChange) -> Analysis {
        let ticker = price_change.symbol.clone();
        let query = format!("{ticker} price movement financial news");

        let candidates = search_news(self.llm.as_ref(), &query, SEARCH_MAX_RESULTS).await;
        info!(ticker = %ticker, found = candidates.len(), "news search finished");

        let ranked = self
            .filter
            .filter_news(candidates, &self.context, &ticker)
            .await;
        info!(ticker = %ticker, kept = ranked.len(), "news filter finished");

        let impact = impact::analyze_impact(
            self.llm.as_ref(),
            &ticker,
            price_change,
            &ranked,
            &self.context,
        )
        .await;
        info!(ticker = %ticker, "analysis completed");

        let analysis = Analysis {
            ticker,
            price_change: price_change.clone(),
            news_articles: ranked,
            analysis: impact,
        };
        self.history.insert(analysis.clone());
        analysis
    }

    /// On-demand sweep: bypasses the hourly gate and the significance filter,
    /// running every tracked symbol with available data through the full
    /// pipeline so the caller always receives some analysis per symbol.
    pub async fn analyze_all(&self) -> Result<Vec<Analysis>> {
        let mut movements = self.poll_once().await;

        if movements.is_empty() {
            for ticker in &self.cfg.monitored_tickers {
                match self.market.price_change(ticker, LOOKBACK_HOURS).await {
                    Ok(Some(pc)) => movements.push(pc),
                    Ok(None) => {
                        info!(ticker = %ticker, "no price data for on-demand analysis");
                    }
                    Err(e) => {
                        warn!(ticker = %ticker, error = %e, "price check failed in on-demand analysis");
                        counter!("market_provider_errors_total").increment(1);
                    }
                }
            }
        }

        let mut analyses = Vec::with_capacity(movements.len());
        for movement in &movements {
            analyses.push(self.analyze_movement(movement).await);
        }
        Ok(analyses)
    }

    /// The scheduling loop. Outside market hours a cycle is a logged no-op.
    /// An errored cycle retries after the short backoff instead of the full
    /// period, bounding the blast radius of transient failures.
    pub async fn run_forever(self: Arc<Self>) {
        info!(
            tickers = ?self.cfg.monitored_tickers,
            interval_secs = self.cfg.poll_interval_secs,
            "starting price monitoring loop"
        );
        loop {
            let sleep_secs = match self.run_cycle().await {
                Ok(()) => self.cfg.poll_interval_secs,
                Err(e) => {
                    error!(error = %e, "monitoring cycle failed; backing off");
                    self.cfg.error_backoff_secs
                }
            };
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        if !self.clock.is_market_hours(Utc::now()) {
            info!("outside market hours, skipping check");
            return Ok(());
        }

        let movements = self.poll_once().await;
        if movements.is_empty() {
            info!("no significant price movements detected");
        } else {
            info!(count = movements.len(), "significant price movements detected");
            for movement in &movements {
                self.analyze_movement(movement).await;
            }
        }

        counter!("monitor_cycles_total").increment(1);
        gauge!("monitor_last_cycle_ts").set(Utc::now().timestamp() as f64);
        Ok(())
    }
}
