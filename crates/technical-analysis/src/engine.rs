use analysis_core::{Candle, TechnicalIndicators};
use serde::{Deserialize, Serialize};

use crate::indicators::*;
use crate::structure::*;

/// Periods and tolerances used to build an indicator snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSettings {
    /// Below this many candles the neutral snapshot is returned
    pub min_candles: usize,
    pub atr_period: usize,
    pub rsi_period: usize,
    pub fast_ema: usize,
    pub slow_ema: usize,
    pub volatility_period: usize,
    pub momentum_period: usize,
    pub swing_lookback: usize,
    /// Relative distance within which swing prices merge into one level
    pub cluster_tolerance: f64,
    pub max_levels_per_side: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            min_candles: 21,
            atr_period: 14,
            rsi_period: 14,
            fast_ema: 9,
            slow_ema: 21,
            volatility_period: 14,
            momentum_period: 10,
            swing_lookback: 5,
            cluster_tolerance: 0.02,
            max_levels_per_side: 3,
        }
    }
}

/// Converts a candle window into a `TechnicalIndicators` snapshot
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    settings: IndicatorSettings,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: IndicatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Compute the snapshot. Never fails: short windows yield the neutral default.
    pub fn compute(&self, candles: &[Candle]) -> TechnicalIndicators {
        let s = &self.settings;
        if candles.len() < s.min_candles {
            tracing::debug!(
                "Indicator engine: {} candles (need {}), returning neutral snapshot",
                candles.len(),
                s.min_candles
            );
            return TechnicalIndicators::neutral();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let current_price = closes[closes.len() - 1];

        let ema9 = ema(&closes, s.fast_ema);
        let ema21 = ema(&closes, s.slow_ema);

        let swings = swing_points(candles, s.swing_lookback);
        let fibonacci_levels = fibonacci_levels(&swings);
        let support_resistance = if swings.is_empty() {
            None
        } else {
            Some(support_resistance(
                &swings,
                current_price,
                s.cluster_tolerance,
                s.max_levels_per_side,
            ))
        };

        TechnicalIndicators {
            atr: atr(candles, s.atr_period),
            ema9,
            ema21,
            rsi: rsi(&closes, s.rsi_period),
            volatility: volatility(&closes, s.volatility_period),
            momentum: momentum(&closes, s.momentum_period),
            trend_strength: trend_strength(ema9, ema21),
            vwap: vwap(candles),
            fibonacci_levels,
            swing_points: if swings.is_empty() { None } else { Some(swings) },
            support_resistance,
        }
    }
}
