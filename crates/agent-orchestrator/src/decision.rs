use analysis_core::{RegimeClassification, TechnicalIndicators, TradeSide};
use chrono::{DateTime, Utc};
use risk_manager::RiskDecision;
use serde::{Deserialize, Serialize};
use strategy_executor::{StrategyOutcome, TradeSignal};
use volatility_guard::VolatilityStatus;

use crate::agents::AgentState;
use crate::messages::AgentMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
    /// Close existing exposure; not produced by the rule set yet
    Exit,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
            TradeAction::Exit => "EXIT",
        }
    }
}

impl From<TradeSide> for TradeAction {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Buy => TradeAction::Buy,
            TradeSide::Sell => TradeAction::Sell,
        }
    }
}

/// What each stage saw and decided during one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContributions {
    pub regime: RegimeClassification,
    /// Absent when the kill switch skipped the risk stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskDecision>,
    pub volatility: VolatilityStatus,
    pub strategy: StrategyOutcome,
}

/// Pipeline output for one symbol and one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingDecision {
    pub id: String,
    pub symbol: String,
    pub action: TradeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<TradeSignal>,
    pub regime: RegimeClassification,
    pub risk_approved: bool,
    pub volatility_ok: bool,
    pub explanation: String,
    pub agent_contributions: AgentContributions,
    pub indicators: TechnicalIndicators,
    pub timestamp: DateTime<Utc>,
}

/// Observability view of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorSnapshot {
    pub is_running: bool,
    pub agents: Vec<AgentState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_decision: Option<TradingDecision>,
    pub message_log: Vec<AgentMessage>,
    /// Symbols with live risk and volatility state
    pub symbols: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
