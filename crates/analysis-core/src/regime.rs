use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    /// Directional move with enough momentum to follow
    Trending,

    /// Sideways, mean-reverting price action
    RangeBound,

    /// Volatility above the tolerated band, no new exposure
    HighVolatility,
}

impl MarketRegime {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            MarketRegime::Trending => "Trending",
            MarketRegime::RangeBound => "Range-bound",
            MarketRegime::HighVolatility => "High volatility",
        }
    }

    /// Strategy used while this regime holds
    pub fn strategy(&self) -> StrategyKind {
        match self {
            MarketRegime::Trending => StrategyKind::TrendFollowing,
            MarketRegime::RangeBound => StrategyKind::MeanReversion,
            MarketRegime::HighVolatility => StrategyKind::NoTrade,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    TrendFollowing,
    MeanReversion,
    NoTrade,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::TrendFollowing => "trend-following",
            StrategyKind::MeanReversion => "mean-reversion",
            StrategyKind::NoTrade => "no-trade",
        }
    }
}

/// Indicator features the classification was made from
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeFeatures {
    pub momentum: f64,
    pub volatility: f64,
    pub trend_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeClassification {
    pub regime: MarketRegime,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub features: RegimeFeatures,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

impl RegimeClassification {
    /// Forced classification used when the kill switch pre-empts the classifier
    pub fn halted(features: RegimeFeatures, timestamp: DateTime<Utc>) -> Self {
        Self {
            regime: MarketRegime::HighVolatility,
            confidence: 0.0,
            features,
            reasoning: "Regime forced to HIGH_VOLATILITY by the kill switch".to_string(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_mapping() {
        assert_eq!(MarketRegime::Trending.strategy(), StrategyKind::TrendFollowing);
        assert_eq!(MarketRegime::RangeBound.strategy(), StrategyKind::MeanReversion);
        assert_eq!(MarketRegime::HighVolatility.strategy(), StrategyKind::NoTrade);
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&MarketRegime::RangeBound).unwrap();
        assert_eq!(json, "\"RANGE_BOUND\"");

        let features = RegimeFeatures { momentum: 0.1, volatility: 0.2, trend_strength: 0.3 };
        let value = serde_json::to_value(features).unwrap();
        assert!(value.get("trendStrength").is_some());
    }
}
