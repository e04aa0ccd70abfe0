use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // Replay input
    pub candle_feed_path: String,          // feed.json
    pub window_size: usize,                // 50 candles per pipeline run

    // Loop
    pub poll_interval_ms: u64,             // 1000
    pub base_position_size: f64,           // units before risk scaling

    // Telemetry
    pub metrics_log_interval_cycles: u64,  // 10
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            candle_feed_path: env::var("CANDLE_FEED_PATH")
                .unwrap_or_else(|_| "feed.json".to_string()),
            window_size: env::var("WINDOW_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("WINDOW_SIZE must be a positive integer")?,
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("POLL_INTERVAL_MS must be an integer")?,
            base_position_size: env::var("BASE_POSITION_SIZE")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()
                .context("BASE_POSITION_SIZE must be a number")?,
            metrics_log_interval_cycles: env::var("METRICS_LOG_INTERVAL_CYCLES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("METRICS_LOG_INTERVAL_CYCLES must be an integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            bail!("WINDOW_SIZE must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be at least 1");
        }
        if !(self.base_position_size.is_finite() && self.base_position_size > 0.0) {
            bail!(
                "BASE_POSITION_SIZE must be positive, got {}",
                self.base_position_size
            );
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            candle_feed_path: "feed.json".to_string(),
            window_size: 50,
            poll_interval_ms: 1000,
            base_position_size: 1.0,
            metrics_log_interval_cycles: 10,
        }
    }
}
