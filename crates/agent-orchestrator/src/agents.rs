use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentKind {
    RegimeDetector,
    RiskController,
    VolatilityGuard,
    StrategyExecutor,
}

impl AgentKind {
    /// Pipeline order
    pub const ALL: [AgentKind; 4] = [
        AgentKind::RegimeDetector,
        AgentKind::RiskController,
        AgentKind::VolatilityGuard,
        AgentKind::StrategyExecutor,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AgentKind::RegimeDetector => "regime-detector",
            AgentKind::RiskController => "risk-controller",
            AgentKind::VolatilityGuard => "volatility-guard",
            AgentKind::StrategyExecutor => "strategy-executor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Idle,
    Analyzing,
    Acting,
    Error,
    /// Only the volatility guard, while the kill switch holds
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub status: AgentStatus,
    pub last_action: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl AgentState {
    pub fn new(kind: AgentKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: kind.id().to_string(),
            kind,
            status: AgentStatus::Idle,
            last_action: "Initialized".to_string(),
            confidence: 0.0,
            timestamp,
        }
    }

    pub fn begin(&mut self, timestamp: DateTime<Utc>) {
        self.status = AgentStatus::Analyzing;
        self.timestamp = timestamp;
    }

    pub fn finish(
        &mut self,
        status: AgentStatus,
        action: impl Into<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) {
        self.status = status;
        self.last_action = action.into();
        self.confidence = confidence.clamp(0.0, 1.0);
        self.timestamp = timestamp;
    }
}
