//! Market Move Analyzer binary entrypoint.
//! Boots the monitoring loop and the Axum HTTP server, wiring config, shared
//! state, and middleware.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_move_analyzer::api::{self, AppState};
use market_move_analyzer::config::{self, AppConfig};
use market_move_analyzer::history::RecentAnalyses;
use market_move_analyzer::llm::build_llm_client;
use market_move_analyzer::market::build_provider;
use market_move_analyzer::metrics::Metrics;
use market_move_analyzer::monitor::MonitoringService;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_move_analyzer=info,info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load();
    let context = config::load_strategic_context(&cfg.context_path);
    info!(
        tickers = ?cfg.monitored_tickers,
        threshold = cfg.price_change_threshold,
        provider = %cfg.market_provider,
        "configuration loaded"
    );

    let metrics = Metrics::init(cfg.poll_interval_secs);

    let market = build_provider(&cfg);
    let llm = build_llm_client(&cfg.llm);
    let history = Arc::new(RecentAnalyses::default());

    let monitor = Arc::new(MonitoringService::new(
        cfg,
        context,
        market,
        llm,
        history.clone(),
    ));

    // Long-lived polling task; the HTTP server owns the main task.
    tokio::spawn(monitor.clone().run_forever());

    let state = AppState {
        monitor,
        history,
    };
    let router = api::create_router(state).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "serving HTTP");
    axum::serve(listener, router).await?;

    Ok(())
}
