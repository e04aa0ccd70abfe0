use std::collections::BTreeMap;
use std::path::Path;

use analysis_core::{validate_candles, AccountBalance, Candle, Position};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Recorded market data for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFeed {
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub positions: Vec<Position>,
    pub balance: AccountBalance,
}

/// Replay input keyed by symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayFeed {
    pub symbols: BTreeMap<String, SymbolFeed>,
}

impl ReplayFeed {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read candle feed {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid candle feed {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let feed: ReplayFeed = serde_json::from_str(raw).context("feed is not valid JSON")?;
        for (symbol, data) in &feed.symbols {
            validate_candles(&data.candles)
                .with_context(|| format!("malformed candles for {}", symbol))?;
        }
        Ok(feed)
    }
}

/// Slides a fixed-size window forward one candle per call
#[derive(Debug, Clone)]
pub struct ReplayCursor {
    candles: Vec<Candle>,
    window: usize,
    end: usize,
}

impl ReplayCursor {
    pub fn new(candles: Vec<Candle>, window: usize) -> Self {
        let window = window.max(1);
        let end = window.min(candles.len());
        Self {
            candles,
            window,
            end,
        }
    }

    /// Next window, or None once the feed is exhausted
    pub fn next_window(&mut self) -> Option<&[Candle]> {
        if self.end == 0 || self.end > self.candles.len() {
            return None;
        }
        let start = self.end.saturating_sub(self.window);
        let end = self.end;
        self.end += 1;
        Some(&self.candles[start..end])
    }

    pub fn remaining(&self) -> usize {
        (self.candles.len() + 1).saturating_sub(self.end)
    }
}
