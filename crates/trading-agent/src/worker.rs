use std::sync::Arc;
use std::time::Duration;

use agent_orchestrator::TradingOrchestrator;
use analysis_core::PipelineError;
use tokio::sync::{watch, Mutex};
use tokio::time;

use crate::config::AgentConfig;
use crate::feed::{ReplayCursor, SymbolFeed};
use crate::metrics::AgentMetrics;

/// Why a worker returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    FeedExhausted,
    Shutdown,
    OrchestratorStopped,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub window_size: usize,
    pub poll_interval: Duration,
    pub base_position_size: f64,
}

impl From<&AgentConfig> for WorkerSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            window_size: config.window_size,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            base_position_size: config.base_position_size,
        }
    }
}

/// Single writer for one symbol: replays its feed through the shared
/// orchestrator, one window per tick.
pub async fn run_symbol_worker(
    symbol: String,
    feed: SymbolFeed,
    settings: WorkerSettings,
    orchestrator: Arc<Mutex<TradingOrchestrator>>,
    metrics: Arc<AgentMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> WorkerExit {
    let SymbolFeed {
        candles,
        positions,
        balance,
    } = feed;
    let mut cursor = ReplayCursor::new(candles, settings.window_size);
    let mut interval = time::interval(settings.poll_interval);

    tracing::info!(
        "Worker for {} started ({} windows to replay)",
        symbol,
        cursor.remaining()
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(window) = cursor.next_window() else {
                    tracing::info!("Worker for {}: feed exhausted", symbol);
                    return WorkerExit::FeedExhausted;
                };

                let cycle_start = AgentMetrics::start_timer();
                let result = orchestrator
                    .lock()
                    .await
                    .run_pipeline(&symbol, window, &positions, &balance, settings.base_position_size);

                match result {
                    Ok(decision) => metrics.record_decision(&decision, cycle_start),
                    Err(PipelineError::Stopped) => {
                        tracing::info!("Worker for {}: orchestrator stopped", symbol);
                        return WorkerExit::OrchestratorStopped;
                    }
                    Err(e) => {
                        metrics.record_error(&symbol);
                        tracing::error!("Pipeline error for {}: {}", symbol, e);
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("Worker for {}: shutdown requested", symbol);
                    return WorkerExit::Shutdown;
                }
            }
        }
    }
}
