use std::collections::HashMap;
use std::sync::Arc;

use analysis_core::{
    AccountBalance, Candle, Clock, PipelineError, Position, RegimeClassification, RegimeFeatures,
    TechnicalIndicators,
};
use chrono::{DateTime, Utc};
use market_regime_detector::RegimeClassifier;
use risk_manager::{RiskDecision, RiskEngine, RiskInputs, RiskState, TradeOutcome};
use strategy_executor::{StrategyExecutor, StrategyOutcome};
use technical_analysis::IndicatorEngine;
use uuid::Uuid;
use volatility_guard::{VolatilityGuard, VolatilityStatus};

use crate::agents::{AgentKind, AgentState, AgentStatus};
use crate::config::PipelineConfig;
use crate::decision::{AgentContributions, OrchestratorSnapshot, TradeAction, TradingDecision};
use crate::messages::{AgentCommand, AgentMessage, MessagePayload, MessageTarget};
use crate::ring::BoundedLog;

/// Mutable stage state owned by one symbol
#[derive(Debug, Clone)]
struct SymbolPipeline {
    guard: VolatilityGuard,
    risk: RiskEngine,
}

/// Long-lived pipeline service.
///
/// Volatility history and risk counters are partitioned per symbol. Agent
/// states and the decision and message logs are shared across symbols; every
/// entry carries the symbol it belongs to.
pub struct TradingOrchestrator {
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    indicator_engine: IndicatorEngine,
    classifier: RegimeClassifier,
    executor: StrategyExecutor,
    symbols: HashMap<String, SymbolPipeline>,
    agents: Vec<AgentState>,
    decisions: BoundedLog<TradingDecision>,
    messages: BoundedLog<AgentMessage>,
    is_running: bool,
}

impl TradingOrchestrator {
    pub fn new(config: PipelineConfig, clock: Arc<dyn Clock>) -> Result<Self, PipelineError> {
        config.validate()?;

        let mut orchestrator = Self {
            indicator_engine: IndicatorEngine::with_settings(config.indicators.clone()),
            classifier: RegimeClassifier::with_thresholds(config.regime.clone()),
            executor: StrategyExecutor::with_settings(config.strategy.clone()),
            symbols: HashMap::new(),
            agents: Vec::new(),
            decisions: BoundedLog::new(config.decision_history_capacity),
            messages: BoundedLog::new(config.message_log_capacity),
            is_running: false,
            config,
            clock,
        };
        orchestrator.init();
        Ok(orchestrator)
    }

    /// Create the four agent states and start accepting runs
    pub fn init(&mut self) {
        let now = self.clock.now();
        self.agents = AgentKind::ALL.iter().map(|&kind| AgentState::new(kind, now)).collect();
        self.is_running = true;
        tracing::info!("Trading orchestrator initialized with {} agents", self.agents.len());
    }

    /// Drop all per-symbol state and history, then re-initialize
    pub fn reset(&mut self) {
        self.symbols.clear();
        self.decisions.clear();
        self.messages.clear();
        self.init();
        tracing::info!("Trading orchestrator reset");
    }

    /// Refuse further runs; history stays readable
    pub fn stop(&mut self) {
        self.is_running = false;
        tracing::info!(
            "Trading orchestrator stopped ({} decisions retained)",
            self.decisions.len()
        );
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    pub fn agent(&self, kind: AgentKind) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.kind == kind)
    }

    /// Decision history, oldest first
    pub fn decision_history(&self) -> Vec<TradingDecision> {
        self.decisions.to_vec()
    }

    /// Message log, oldest first
    pub fn messages(&self) -> Vec<AgentMessage> {
        self.messages.to_vec()
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_decision(&self) -> Option<&TradingDecision> {
        self.decisions.latest()
    }

    pub fn risk_state(&self, symbol: &str) -> Option<&RiskState> {
        self.symbols.get(symbol).map(|p| p.risk.state())
    }

    pub fn volatility_history(&self, symbol: &str) -> Option<Vec<f64>> {
        self.symbols.get(symbol).map(|p| p.guard.history())
    }

    /// Forget a symbol's volatility history and risk counters.
    ///
    /// Logged decisions and messages for the symbol stay in the rings. Returns
    /// false when the symbol was never seen.
    pub fn drop_symbol(&mut self, symbol: &str) -> bool {
        let dropped = self.symbols.remove(symbol).is_some();
        if dropped {
            tracing::info!("Dropped risk and volatility state for {}", symbol);
        }
        dropped
    }

    pub fn state(&self) -> OrchestratorSnapshot {
        let mut symbols: Vec<String> = self.symbols.keys().cloned().collect();
        symbols.sort();

        OrchestratorSnapshot {
            is_running: self.is_running,
            agents: self.agents.clone(),
            last_decision: self.decisions.latest().cloned(),
            message_log: self.messages.to_vec(),
            symbols,
            timestamp: self.clock.now(),
        }
    }

    /// Feed a closed trade into the symbol's risk counters
    pub fn record_trade(&mut self, symbol: &str, pnl: f64, equity: f64, closed_at: DateTime<Utc>) {
        let pipeline = self.pipeline_for(symbol);
        pipeline.risk.record_trade(TradeOutcome {
            pnl,
            equity,
            closed_at,
        });
    }

    /// Run every stage for one symbol and record the decision.
    pub fn run_pipeline(
        &mut self,
        symbol: &str,
        candles: &[Candle],
        positions: &[Position],
        balance: &AccountBalance,
        base_position_size: f64,
    ) -> Result<TradingDecision, PipelineError> {
        if !self.is_running {
            return Err(PipelineError::Stopped);
        }
        let Some(latest) = candles.last() else {
            return Err(PipelineError::InsufficientData(format!(
                "no candles supplied for {}",
                symbol
            )));
        };
        let price = latest.close;
        let now = self.clock.now();

        let indicators = self.indicator_engine.compute(candles);

        self.begin(AgentKind::VolatilityGuard, now);
        let volatility = self
            .pipeline_for(symbol)
            .guard
            .evaluate(indicators.volatility, candles, now);

        let decision = if volatility.kill_switch_active {
            self.halt(symbol, indicators, volatility, now)
        } else {
            self.full_run(
                symbol,
                indicators,
                volatility,
                positions,
                balance,
                price,
                base_position_size,
                now,
            )
        };

        tracing::info!(
            "Decision for {}: {} (regime {}, risk approved: {}, volatility ok: {})",
            symbol,
            decision.action.as_str(),
            decision.regime.regime.name(),
            decision.risk_approved,
            decision.volatility_ok
        );

        self.decisions.push(decision.clone());
        Ok(decision)
    }

    /// Kill-switch short circuit: HOLD, with the downstream agents reporting a skip
    fn halt(
        &mut self,
        symbol: &str,
        indicators: TechnicalIndicators,
        volatility: VolatilityStatus,
        now: DateTime<Utc>,
    ) -> TradingDecision {
        let reason = volatility.describe();
        let skipped = "Skipped: kill switch active".to_string();
        let regime = RegimeClassification::halted(
            RegimeFeatures {
                momentum: indicators.momentum,
                volatility: indicators.volatility,
                trend_strength: indicators.trend_strength,
            },
            now,
        );
        let strategy = StrategyOutcome::none(regime.regime.strategy(), skipped.clone());

        self.finish(AgentKind::VolatilityGuard, AgentStatus::Suspended, "Kill switch engaged", 1.0, now);
        for kind in [AgentKind::RegimeDetector, AgentKind::RiskController, AgentKind::StrategyExecutor] {
            self.finish(kind, AgentStatus::Idle, skipped.clone(), 0.0, now);
        }

        self.emit(
            AgentKind::VolatilityGuard,
            MessageTarget::Broadcast,
            symbol,
            MessagePayload::Command {
                command: AgentCommand::Halt,
                reason: reason.clone(),
                status: volatility.clone(),
            },
            now,
        );
        self.emit(
            AgentKind::RegimeDetector,
            MessageTarget::Orchestrator,
            symbol,
            MessagePayload::Analysis {
                regime: regime.regime,
                confidence: regime.confidence,
                reasoning: regime.reasoning.clone(),
            },
            now,
        );
        self.emit(
            AgentKind::RiskController,
            MessageTarget::Orchestrator,
            symbol,
            MessagePayload::Decision {
                approved: false,
                risk: None,
                reason: skipped.clone(),
            },
            now,
        );
        self.emit(
            AgentKind::StrategyExecutor,
            MessageTarget::Orchestrator,
            symbol,
            MessagePayload::Recommendation {
                signal: None,
                reason: skipped,
            },
            now,
        );

        TradingDecision {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            action: TradeAction::Hold,
            signal: None,
            regime: regime.clone(),
            risk_approved: false,
            volatility_ok: false,
            explanation: format!("{} Trading halted for this cycle.", reason),
            agent_contributions: AgentContributions {
                regime,
                risk: None,
                volatility,
                strategy,
            },
            indicators,
            timestamp: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn full_run(
        &mut self,
        symbol: &str,
        indicators: TechnicalIndicators,
        volatility: VolatilityStatus,
        positions: &[Position],
        balance: &AccountBalance,
        price: f64,
        base_position_size: f64,
        now: DateTime<Utc>,
    ) -> TradingDecision {
        let volatility_confidence = if volatility.is_abnormal() { 0.5 } else { 1.0 };
        self.finish(
            AgentKind::VolatilityGuard,
            AgentStatus::Idle,
            volatility.describe(),
            volatility_confidence,
            now,
        );
        self.emit(
            AgentKind::VolatilityGuard,
            MessageTarget::Agent(AgentKind::RiskController),
            symbol,
            MessagePayload::Alert {
                status: volatility.clone(),
            },
            now,
        );

        // Regime
        self.begin(AgentKind::RegimeDetector, now);
        let regime = self.classifier.classify(&indicators, now);
        self.finish(
            AgentKind::RegimeDetector,
            AgentStatus::Idle,
            format!("Classified {}", regime.regime.name()),
            regime.confidence,
            now,
        );
        self.emit(
            AgentKind::RegimeDetector,
            MessageTarget::Agent(AgentKind::RiskController),
            symbol,
            MessagePayload::Analysis {
                regime: regime.regime,
                confidence: regime.confidence,
                reasoning: regime.reasoning.clone(),
            },
            now,
        );

        // Risk
        self.begin(AgentKind::RiskController, now);
        let risk: RiskDecision = self.pipeline_for(symbol).risk.evaluate(
            RiskInputs {
                regime: &regime,
                current_volatility: indicators.volatility,
                positions,
                balance,
            },
            now,
        );
        let approved = risk.approved();
        let risk_action = if risk.trade_suspended {
            "Trading suspended".to_string()
        } else if risk.trade_cooldown_active {
            "Cooldown active".to_string()
        } else {
            format!("Approved at {:.2}x size", risk.position_size_multiplier)
        };
        self.finish(
            AgentKind::RiskController,
            AgentStatus::Idle,
            risk_action,
            risk.position_size_multiplier,
            now,
        );
        self.emit(
            AgentKind::RiskController,
            MessageTarget::Agent(AgentKind::StrategyExecutor),
            symbol,
            MessagePayload::Decision {
                approved,
                risk: Some(risk.clone()),
                reason: risk.explanation.clone(),
            },
            now,
        );

        // Strategy
        self.begin(AgentKind::StrategyExecutor, now);
        let mut strategy = self
            .executor
            .generate(symbol, &regime, &indicators, price, approved);
        if let Some(signal) = strategy.signal.as_mut() {
            signal.size = self
                .pipeline_for(symbol)
                .risk
                .adjusted_size(&risk, base_position_size, balance.equity, price);
        }
        let (strategy_action, strategy_confidence) = match &strategy.signal {
            Some(signal) => (
                format!("{} {} signal", strategy.strategy.name(), signal.side.as_str()),
                signal.confidence,
            ),
            None => ("No signal".to_string(), 0.0),
        };
        self.finish(
            AgentKind::StrategyExecutor,
            AgentStatus::Idle,
            strategy_action,
            strategy_confidence,
            now,
        );
        self.emit(
            AgentKind::StrategyExecutor,
            MessageTarget::Orchestrator,
            symbol,
            MessagePayload::Recommendation {
                signal: strategy.signal.clone(),
                reason: strategy.reason.clone(),
            },
            now,
        );

        // Assembly: regime, volatility (only if abnormal), risk, strategy
        let mut sentences = vec![regime.reasoning.clone()];
        if volatility.is_abnormal() {
            sentences.push(volatility.describe());
        }
        sentences.push(risk.explanation.clone());
        sentences.push(strategy.reason.clone());

        let action = strategy
            .signal
            .as_ref()
            .map(|s| TradeAction::from(s.side))
            .unwrap_or(TradeAction::Hold);

        TradingDecision {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            action,
            signal: strategy.signal.clone(),
            regime: regime.clone(),
            risk_approved: approved,
            volatility_ok: !volatility.is_abnormal(),
            explanation: sentences.join(" "),
            agent_contributions: AgentContributions {
                regime,
                risk: Some(risk),
                volatility,
                strategy,
            },
            indicators,
            timestamp: now,
        }
    }

    fn pipeline_for(&mut self, symbol: &str) -> &mut SymbolPipeline {
        let config = &self.config;
        self.symbols.entry(symbol.to_string()).or_insert_with(|| {
            tracing::debug!("Creating risk and volatility state for {}", symbol);
            SymbolPipeline {
                guard: VolatilityGuard::new(config.volatility.clone()),
                risk: RiskEngine::new(config.risk.clone()),
            }
        })
    }

    fn begin(&mut self, kind: AgentKind, now: DateTime<Utc>) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.kind == kind) {
            agent.begin(now);
        }
    }

    fn finish(
        &mut self,
        kind: AgentKind,
        status: AgentStatus,
        action: impl Into<String>,
        confidence: f64,
        now: DateTime<Utc>,
    ) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.kind == kind) {
            agent.finish(status, action, confidence, now);
        }
    }

    fn emit(
        &mut self,
        from: AgentKind,
        to: MessageTarget,
        symbol: &str,
        payload: MessagePayload,
        now: DateTime<Utc>,
    ) {
        self.messages.push(AgentMessage::new(from, to, symbol, payload, now));
    }
}
