use analysis_core::{MarketRegime, RegimeClassification, RegimeFeatures, TechnicalIndicators};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thresholds the classifier compares indicator features against
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeThresholds {
    /// Base volatility threshold; HIGH_VOLATILITY starts at 1.5x this
    pub volatility_threshold: f64,
    pub high_volatility_multiple: f64,
    pub trend_strength_min: f64,
    pub momentum_min: f64,
    pub weak_trend_strength_min: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            volatility_threshold: 0.03,
            high_volatility_multiple: 1.5,
            trend_strength_min: 0.3,
            momentum_min: 0.01,
            weak_trend_strength_min: 0.2,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

/// Rule-based market regime classifier.
///
/// Pure: the same indicators always classify the same way.
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    thresholds: RegimeThresholds,
}

impl RegimeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: RegimeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RegimeThresholds {
        &self.thresholds
    }

    /// Classify the regime. Rules are evaluated in priority order and the first match wins.
    pub fn classify(
        &self,
        indicators: &TechnicalIndicators,
        timestamp: DateTime<Utc>,
    ) -> RegimeClassification {
        let t = &self.thresholds;
        let features = RegimeFeatures {
            momentum: indicators.momentum,
            volatility: indicators.volatility,
            trend_strength: indicators.trend_strength,
        };

        let rsi_extreme = indicators.rsi > t.rsi_overbought || indicators.rsi < t.rsi_oversold;
        let trending = indicators.trend_strength > t.trend_strength_min
            && indicators.momentum.abs() > t.momentum_min;

        let (regime, confidence) =
            if indicators.volatility > t.volatility_threshold * t.high_volatility_multiple {
                (MarketRegime::HighVolatility, (0.5 + indicators.volatility * 5.0).min(0.95))
            } else if trending && !rsi_extreme {
                (MarketRegime::Trending, (0.5 + indicators.trend_strength * 0.4).min(0.9))
            } else if !trending && indicators.volatility < t.volatility_threshold {
                let rsi_bonus = if rsi_extreme { 0.2 } else { 0.0 };
                let confidence = 0.5 + (1.0 - indicators.trend_strength) * 0.3 + rsi_bonus;
                (MarketRegime::RangeBound, confidence.min(0.85))
            } else if indicators.trend_strength > t.weak_trend_strength_min {
                (MarketRegime::Trending, 0.55)
            } else {
                (MarketRegime::RangeBound, 0.5)
            };

        let reasoning = format!(
            "{} regime ({:.0}% confidence; trend strength {:.2}, momentum {:.2}%, volatility {:.2}%, RSI {:.1})",
            regime.name(),
            confidence * 100.0,
            indicators.trend_strength,
            indicators.momentum * 100.0,
            indicators.volatility * 100.0,
            indicators.rsi
        );

        tracing::debug!("Regime classifier: {}", reasoning);

        RegimeClassification {
            regime,
            confidence: confidence.clamp(0.0, 1.0),
            features,
            reasoning,
            timestamp,
        }
    }
}
