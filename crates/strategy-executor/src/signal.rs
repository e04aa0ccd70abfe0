use analysis_core::{StrategyKind, TechnicalIndicators, TradeSide};
use serde::{Deserialize, Serialize};

/// Fibonacci level the signal was taken against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciContext {
    pub nearest_ratio: f64,
    pub nearest_price: f64,
    /// Relative distance from entry to the level
    pub distance: f64,
    /// Set when the take-profit was moved onto a retracement level
    pub target_from_fibonacci: bool,
}

/// Indicator values behind the signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalContext {
    pub rsi: f64,
    pub ema9: f64,
    pub ema21: f64,
    pub atr: f64,
    pub momentum: f64,
}

impl From<&TechnicalIndicators> for TechnicalContext {
    fn from(ind: &TechnicalIndicators) -> Self {
        Self {
            rsi: ind.rsi,
            ema9: ind.ema9,
            ema21: ind.ema21,
            atr: ind.atr,
            momentum: ind.momentum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSignal {
    pub symbol: String,
    pub side: TradeSide,
    pub strategy: StrategyKind,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Zero until the caller applies risk-adjusted sizing
    pub size: f64,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fibonacci_context: Option<FibonacciContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_context: Option<TechnicalContext>,
}

impl TradeSignal {
    /// Distance from entry to stop, in price units
    pub fn risk_per_unit(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn reward_to_risk(&self) -> Option<f64> {
        let risk = self.risk_per_unit();
        if risk > 0.0 {
            Some((self.take_profit - self.entry_price).abs() / risk)
        } else {
            None
        }
    }
}

/// Signal generation result; `reason` is always filled, even without a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub strategy: StrategyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<TradeSignal>,
    pub reason: String,
}

impl StrategyOutcome {
    pub fn none(strategy: StrategyKind, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            signal: None,
            reason: reason.into(),
        }
    }
}
