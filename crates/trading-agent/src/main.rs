use std::sync::Arc;

use agent_orchestrator::{PipelineConfig, TradingOrchestrator};
use analysis_core::SystemClock;
use anyhow::{Context, Result};
use tokio::signal::unix::SignalKind;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

mod config;
mod feed;
mod metrics;
mod worker;

use config::AgentConfig;
use feed::ReplayFeed;
use metrics::AgentMetrics;
use worker::{run_symbol_worker, WorkerExit, WorkerSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Panic hook: log panic info before crashing
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting RegimeDesk trading agent");

    // 2. Load configuration
    let config = AgentConfig::from_env()?;
    let pipeline_config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Candle feed: {}", config.candle_feed_path);
    tracing::info!("  Window: {} candles, poll every {}ms", config.window_size, config.poll_interval_ms);
    tracing::info!("  Base position size: {}", config.base_position_size);
    tracing::info!(
        "  Volatility threshold: {:.2}%, daily loss limit: {:.1}%, cooldown: {}s",
        pipeline_config.volatility.volatility_threshold * 100.0,
        pipeline_config.risk.max_daily_loss_percent,
        pipeline_config.risk.trade_cooldown_secs
    );

    // 3. Load replay feed
    let feed = ReplayFeed::load(&config.candle_feed_path).await?;
    if feed.symbols.is_empty() {
        tracing::warn!("Candle feed {} has no symbols, nothing to do", config.candle_feed_path);
        return Ok(());
    }
    tracing::info!("Loaded feed for {} symbols", feed.symbols.len());

    // 4. Initialize orchestrator
    let orchestrator = Arc::new(Mutex::new(
        TradingOrchestrator::new(pipeline_config, Arc::new(SystemClock))
            .context("failed to initialize orchestrator")?,
    ));
    let agent_metrics = Arc::new(AgentMetrics::new(config.metrics_log_interval_cycles));

    // 5. One worker per symbol
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let settings = WorkerSettings::from(&config);
    let mut workers = JoinSet::new();
    for (symbol, symbol_feed) in feed.symbols {
        workers.spawn(run_symbol_worker(
            symbol,
            symbol_feed,
            settings,
            Arc::clone(&orchestrator),
            Arc::clone(&agent_metrics),
            shutdown_rx.clone(),
        ));
    }

    // Main loop with graceful shutdown (SIGINT + SIGTERM)
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            joined = workers.join_next() => {
                match joined {
                    Some(Ok(WorkerExit::FeedExhausted)) => {}
                    Some(Ok(exit)) => tracing::debug!("Worker exited: {:?}", exit),
                    Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
                    None => {
                        tracing::info!("All feeds replayed");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, exiting gracefully...");
                orchestrator.lock().await.stop();
                shutdown_tx.send(true).ok();
                while workers.join_next().await.is_some() {}
                break;
            }
        }
    }

    // Final report
    agent_metrics.log_metrics();
    let snapshot = orchestrator.lock().await.state();
    tracing::info!(
        cycles = agent_metrics.total_cycles(),
        symbols = snapshot.symbols.len(),
        messages = snapshot.message_log.len(),
        "Trading agent stopped"
    );
    if let Some(last) = snapshot.last_decision.as_ref() {
        tracing::info!("Last decision: {} {} ({})", last.symbol, last.action.as_str(), last.explanation);
    }
    tracing::debug!("Final metrics: {}", agent_metrics.to_json());

    Ok(())
}
