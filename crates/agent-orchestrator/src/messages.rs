use analysis_core::MarketRegime;
use chrono::{DateTime, Utc};
use risk_manager::RiskDecision;
use serde::{Deserialize, Serialize};
use strategy_executor::TradeSignal;
use uuid::Uuid;
use volatility_guard::VolatilityStatus;

use crate::agents::AgentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Analysis,
    Decision,
    Alert,
    Recommendation,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentCommand {
    /// Stop all downstream work for this cycle
    Halt,
}

/// Recipient of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageTarget {
    Agent(AgentKind),
    Orchestrator,
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    /// Regime detector output
    #[serde(rename_all = "camelCase")]
    Analysis {
        regime: MarketRegime,
        confidence: f64,
        reasoning: String,
    },
    /// Risk controller verdict; `risk` is absent when the stage was skipped
    #[serde(rename_all = "camelCase")]
    Decision {
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        risk: Option<RiskDecision>,
        reason: String,
    },
    /// Volatility guard reading
    #[serde(rename_all = "camelCase")]
    Alert { status: VolatilityStatus },
    /// Strategy executor output
    #[serde(rename_all = "camelCase")]
    Recommendation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<TradeSignal>,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    Command {
        command: AgentCommand,
        reason: String,
        status: VolatilityStatus,
    },
}

impl MessagePayload {
    pub fn kind(&self) -> MessageType {
        match self {
            MessagePayload::Analysis { .. } => MessageType::Analysis,
            MessagePayload::Decision { .. } => MessageType::Decision,
            MessagePayload::Alert { .. } => MessageType::Alert,
            MessagePayload::Recommendation { .. } => MessageType::Recommendation,
            MessagePayload::Command { .. } => MessageType::Command,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub id: String,
    pub from_agent: AgentKind,
    pub to_agent: MessageTarget,
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub payload: MessagePayload,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(
        from_agent: AgentKind,
        to_agent: MessageTarget,
        symbol: &str,
        payload: MessagePayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from_agent,
            to_agent,
            symbol: symbol.to_string(),
            kind: payload.kind(),
            payload,
            timestamp,
        }
    }
}
