use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Relative intrabar range, (high - low) / low
    pub fn range_ratio(&self) -> f64 {
        if self.low <= 0.0 {
            return 0.0;
        }
        (self.high - self.low) / self.low
    }

    /// Relative body size, |close - open| / open
    pub fn body_ratio(&self) -> f64 {
        if self.open <= 0.0 {
            return 0.0;
        }
        (self.close - self.open).abs() / self.open
    }
}

/// Check the ordering and OHLC invariants of a candle window.
///
/// The pipeline assumes these hold; hosts call this before handing data in.
pub fn validate_candles(candles: &[Candle]) -> Result<(), PipelineError> {
    if candles.is_empty() {
        return Err(PipelineError::InsufficientData(
            "candle window is empty".to_string(),
        ));
    }

    for (index, candle) in candles.iter().enumerate() {
        let body_high = candle.open.max(candle.close);
        let body_low = candle.open.min(candle.close);
        if candle.high < body_high || body_low < candle.low {
            return Err(PipelineError::MalformedCandle {
                index,
                reason: format!(
                    "high {} / low {} do not bracket open {} / close {}",
                    candle.high, candle.low, candle.open, candle.close
                ),
            });
        }
        if index > 0 && candle.timestamp <= candles[index - 1].timestamp {
            return Err(PipelineError::MalformedCandle {
                index,
                reason: "timestamps must be strictly ascending".to_string(),
            });
        }
    }

    Ok(())
}

/// Direction of a trade or position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

/// Open position as reported by the exchange collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub side: TradeSide,
    pub size: f64,
    pub entry_price: f64,
    #[serde(default)]
    pub mark_price: Option<f64>,
}

impl Position {
    /// Absolute notional value, marked to market when a mark price is known
    pub fn notional(&self) -> f64 {
        (self.size * self.mark_price.unwrap_or(self.entry_price)).abs()
    }
}

/// Account balance snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub equity: f64,
    pub available: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingKind {
    High,
    Low,
}

/// Local extremum relative to a symmetric lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwingPoint {
    pub index: usize,
    pub kind: SwingKind,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// 0.1 to 1.0
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingDirection {
    /// Swing low printed before the swing high
    Up,
    /// Swing high printed before the swing low
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciLevel {
    /// Retracement ratio in percent (0, 23.6, ... 100)
    pub ratio: f64,
    pub price: f64,
}

/// Retracement grid between the most recent swing high and swing low
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    pub direction: SwingDirection,
    pub levels: Vec<FibonacciLevel>,
}

impl FibonacciLevels {
    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-9)
            .map(|l| l.price)
    }

    /// Closest level to `price`, as (level, relative distance)
    pub fn nearest(&self, price: f64) -> Option<(&FibonacciLevel, f64)> {
        if price <= 0.0 {
            return None;
        }
        self.levels
            .iter()
            .map(|l| (l, (price - l.price).abs() / price))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Clustered swing level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevel {
    pub price: f64,
    pub touches: usize,
}

/// Up to three levels on each side of the current price, nearest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistance {
    pub support: Vec<PriceLevel>,
    pub resistance: Vec<PriceLevel>,
}

/// Indicator snapshot computed fresh from each candle window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub atr: f64,
    pub ema9: f64,
    pub ema21: f64,
    pub rsi: f64,
    pub volatility: f64,
    pub momentum: f64,
    pub trend_strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fibonacci_levels: Option<FibonacciLevels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing_points: Option<Vec<SwingPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_resistance: Option<SupportResistance>,
}

impl TechnicalIndicators {
    /// Snapshot returned when the window is too short to measure anything
    pub fn neutral() -> Self {
        Self {
            atr: 0.0,
            ema9: 0.0,
            ema21: 0.0,
            rsi: 50.0,
            volatility: 0.0,
            momentum: 0.0,
            trend_strength: 0.0,
            vwap: None,
            fibonacci_levels: None,
            swing_points: None,
            support_resistance: None,
        }
    }
}

impl Default for TechnicalIndicators {
    fn default() -> Self {
        Self::neutral()
    }
}
