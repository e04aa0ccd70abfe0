use analysis_core::PipelineError;
use market_regime_detector::RegimeThresholds;
use risk_manager::RiskParameters;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use strategy_executor::StrategySettings;
use technical_analysis::IndicatorSettings;
use volatility_guard::VolatilityGuardConfig;

/// Parameters for every pipeline stage plus the log capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub indicators: IndicatorSettings,
    pub regime: RegimeThresholds,
    pub volatility: VolatilityGuardConfig,
    pub risk: RiskParameters,
    pub strategy: StrategySettings,
    pub decision_history_capacity: usize,
    pub message_log_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorSettings::default(),
            regime: RegimeThresholds::default(),
            volatility: VolatilityGuardConfig::default(),
            risk: RiskParameters::default(),
            strategy: StrategySettings::default(),
            decision_history_capacity: 100,
            message_log_capacity: 500,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by whatever is set in the environment (or `.env`)
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(threshold) = env_override::<f64>("VOLATILITY_THRESHOLD")? {
            config.set_volatility_threshold(threshold);
        }
        if let Some(capacity) = env_override("VOLATILITY_HISTORY_CAPACITY")? {
            config.volatility.history_capacity = capacity;
        }
        if let Some(limit) = env_override("MAX_DAILY_LOSS_PERCENT")? {
            config.risk.max_daily_loss_percent = limit;
        }
        if let Some(limit) = env_override("MAX_POSITION_PERCENT")? {
            config.risk.max_position_percent = limit;
        }
        if let Some(secs) = env_override("TRADE_COOLDOWN_SECS")? {
            config.risk.trade_cooldown_secs = secs;
        }
        if let Some(capacity) = env_override("DECISION_HISTORY_CAPACITY")? {
            config.decision_history_capacity = capacity;
        }
        if let Some(capacity) = env_override("MESSAGE_LOG_CAPACITY")? {
            config.message_log_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }

    /// One threshold shared by the classifier, the guard and the risk engine
    pub fn set_volatility_threshold(&mut self, threshold: f64) {
        self.regime.volatility_threshold = threshold;
        self.volatility.volatility_threshold = threshold;
        self.risk.volatility_threshold = threshold;
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("volatility threshold", self.volatility.volatility_threshold),
            ("regime volatility threshold", self.regime.volatility_threshold),
            ("max daily loss percent", self.risk.max_daily_loss_percent),
            ("max position percent", self.risk.max_position_percent),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.risk.trade_cooldown_secs < 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "trade cooldown must not be negative, got {}s",
                self.risk.trade_cooldown_secs
            )));
        }

        let capacities = [
            ("volatility history capacity", self.volatility.history_capacity),
            ("decision history capacity", self.decision_history_capacity),
            ("message log capacity", self.message_log_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(PipelineError::InvalidConfig(format!("{} must be at least 1", name)));
            }
        }

        Ok(())
    }
}

fn env_override<T>(key: &str) -> Result<Option<T>, PipelineError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| PipelineError::InvalidConfig(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decision_history_capacity, 100);
        assert_eq!(config.message_log_capacity, 500);
    }

    #[test]
    fn test_shared_volatility_threshold() {
        let mut config = PipelineConfig::default();
        config.set_volatility_threshold(0.05);
        assert_eq!(config.regime.volatility_threshold, 0.05);
        assert_eq!(config.volatility.volatility_threshold, 0.05);
        assert_eq!(config.risk.volatility_threshold, 0.05);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = PipelineConfig {
            message_log_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let mut config = PipelineConfig::default();
        config.set_volatility_threshold(0.0);
        assert!(config.validate().is_err());
    }
}
