use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskParameters {
    /// Volatility above this tightens stops and trims size
    pub volatility_threshold: f64,
    /// Maximum daily loss as percentage of equity before suspending (default 5%)
    #[serde(default = "default_daily_loss_limit")]
    pub max_daily_loss_percent: f64,
    /// Fraction of the daily limit at which stops tighten (default 70%)
    pub daily_loss_warning_ratio: f64,
    /// Maximum single position as percentage of equity (default 10%)
    pub max_position_percent: f64,
    /// Minimum spacing between trades, in seconds
    pub trade_cooldown_secs: i64,
    /// Losing streak length that forces a cooldown and halves size (default 3)
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,
    /// Drawdown fraction above which size is throttled (default 2%)
    pub drawdown_floor: f64,
    /// Share of the position budget already in use that triggers the exposure cut
    pub exposure_utilization_limit: f64,
    /// Regime confidence below this trims size
    pub min_regime_confidence: f64,
}

fn default_daily_loss_limit() -> f64 { 5.0 }
fn default_max_consecutive_losses() -> u32 { 3 }

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            volatility_threshold: 0.03,
            max_daily_loss_percent: 5.0,
            daily_loss_warning_ratio: 0.7,
            max_position_percent: 10.0,
            trade_cooldown_secs: 60,
            max_consecutive_losses: 3,
            drawdown_floor: 0.02,
            exposure_utilization_limit: 0.8,
            min_regime_confidence: 0.6,
        }
    }
}

/// Counters carried between evaluations for one instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskState {
    /// Realised drawdown as a fraction of equity (0.02 = 2%)
    pub recent_drawdown: f64,
    pub last_trade_time: Option<DateTime<Utc>>,
    /// Realised loss today as percentage of equity
    pub daily_loss_percent: f64,
    pub consecutive_losses: u32,
    /// UTC day the daily loss counter belongs to
    #[serde(default)]
    pub trading_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopLossAdjustment {
    Normal,
    Tightened,
    Widened,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDecision {
    /// Always within [0.1, 1.0]
    pub position_size_multiplier: f64,
    pub stop_loss_adjustment: StopLossAdjustment,
    pub trade_cooldown_active: bool,
    pub trade_suspended: bool,
    pub risk_level: RiskLevel,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

impl RiskDecision {
    /// New entries are allowed only outside suspension and cooldown
    pub fn approved(&self) -> bool {
        !(self.trade_suspended || self.trade_cooldown_active)
    }
}

/// Result of a closed trade fed back into the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOutcome {
    pub pnl: f64,
    /// Equity the trade was sized against
    pub equity: f64,
    pub closed_at: DateTime<Utc>,
}
