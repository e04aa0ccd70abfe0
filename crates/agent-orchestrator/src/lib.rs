//! Trading pipeline orchestrator.
//!
//! Sequences indicators, the volatility guard, regime classification, risk
//! evaluation and signal generation for each invocation, and keeps the agent
//! states plus bounded decision and message logs alive between invocations.

pub mod agents;
pub mod config;
pub mod decision;
pub mod messages;
pub mod orchestrator;
pub mod ring;
#[cfg(test)]
mod tests;

pub use agents::{AgentKind, AgentState, AgentStatus};
pub use config::PipelineConfig;
pub use decision::{AgentContributions, OrchestratorSnapshot, TradeAction, TradingDecision};
pub use messages::{AgentCommand, AgentMessage, MessagePayload, MessageTarget, MessageType};
pub use orchestrator::TradingOrchestrator;
pub use ring::BoundedLog;
