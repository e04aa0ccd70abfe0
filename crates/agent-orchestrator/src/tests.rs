#[cfg(test)]
mod orchestrator_tests {
    use std::sync::Arc;

    use crate::agents::{AgentKind, AgentStatus};
    use crate::config::PipelineConfig;
    use crate::decision::{TradeAction, TradingDecision};
    use crate::messages::{AgentCommand, MessagePayload, MessageTarget, MessageType};
    use crate::orchestrator::TradingOrchestrator;
    use analysis_core::{AccountBalance, Candle, Clock, ManualClock, MarketRegime, PipelineError, TradeSide};
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use risk_manager::RiskLevel;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap()
    }

    fn orchestrator() -> (TradingOrchestrator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let orch = TradingOrchestrator::new(PipelineConfig::default(), clock.clone()).unwrap();
        (orch, clock)
    }

    fn balance() -> AccountBalance {
        AccountBalance {
            equity: 10_000.0,
            available: 10_000.0,
        }
    }

    fn flat_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle {
                timestamp: start() + Duration::minutes(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1_000.0,
            })
            .collect()
    }

    /// Zig-zag uptrend: +3% then -1.5%, volatility ~2.25%, RSI ~66
    fn uptrend_candles() -> Vec<Candle> {
        let mut close = 100.0;
        (0..40)
            .map(|i| {
                if i > 0 {
                    close *= if i % 2 == 1 { 1.03 } else { 0.985 };
                }
                Candle {
                    timestamp: start() + Duration::minutes(i as i64),
                    open: close,
                    high: close * 1.005,
                    low: close * 0.995,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    }

    /// Alternating 100 / 110 closes: ~9.5% volatility and a flash move on the last bar
    fn violent_candles() -> Vec<Candle> {
        let mut prev = 100.0;
        (0..25)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 110.0 };
                let open = prev;
                prev = close;
                Candle {
                    timestamp: start() + Duration::minutes(i as i64),
                    open,
                    high: f64::max(open, close),
                    low: f64::min(open, close),
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_init_creates_four_idle_agents() {
        let (orch, _) = orchestrator();
        assert!(orch.is_running());
        assert_eq!(orch.agents().len(), 4);
        assert!(orch.agents().iter().all(|a| a.status == AgentStatus::Idle));
        assert!(orch.decision_history().is_empty());
    }

    #[test]
    fn test_trending_market_buys_with_risk_adjusted_size() {
        let (mut orch, _) = orchestrator();
        let candles = uptrend_candles();
        let price = candles.last().unwrap().close;

        let decision = orch
            .run_pipeline("BTC-USD", &candles, &[], &balance(), 5.0)
            .unwrap();

        assert_eq!(decision.regime.regime, MarketRegime::Trending);
        assert_eq!(decision.action, TradeAction::Buy);
        assert!(decision.risk_approved);
        assert!(decision.volatility_ok);

        let signal = decision.signal.as_ref().expect("signal");
        assert_eq!(signal.side, TradeSide::Buy);
        assert_relative_eq!(signal.entry_price, price);
        // 5 units fits under the 10% budget (1000 / price)
        assert_relative_eq!(signal.size, 5.0);
        assert!(decision.agent_contributions.risk.is_some());

        let messages = orch.messages();
        assert_eq!(messages.len(), 4);
        let kinds: Vec<MessageType> = messages.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MessageType::Alert,
                MessageType::Analysis,
                MessageType::Decision,
                MessageType::Recommendation
            ]
        );
    }

    #[test]
    fn test_volume_surge_on_flat_series() {
        let (mut orch, _) = orchestrator();
        let mut candles = flat_candles(25);
        candles.last_mut().unwrap().volume = 3_000.0;

        let decision = orch
            .run_pipeline("ETH-USD", &candles, &[], &balance(), 1.0)
            .unwrap();

        assert_eq!(decision.regime.regime, MarketRegime::RangeBound);
        let volatility = &decision.agent_contributions.volatility;
        assert!(volatility.anomaly_detected);
        assert!(!volatility.spike_detected);
        assert!(!volatility.kill_switch_active);
        assert!(!decision.volatility_ok);

        // regime, volatility, risk, strategy
        let explanation = &decision.explanation;
        let regime_at = explanation.find("Range-bound regime").unwrap();
        let anomaly_at = explanation.find("Market anomaly detected: volume surge").unwrap();
        let risk_at = explanation.find("Position size multiplier").unwrap();
        let strategy_at = explanation.find("mean-reversion").unwrap();
        assert!(regime_at < anomaly_at && anomaly_at < risk_at && risk_at < strategy_at);
    }

    #[test]
    fn test_calm_explanation_omits_volatility() {
        let (mut orch, _) = orchestrator();
        let decision = orch
            .run_pipeline("ETH-USD", &flat_candles(25), &[], &balance(), 1.0)
            .unwrap();
        assert!(decision.volatility_ok);
        assert!(!decision.explanation.contains("Volatility normal"));
    }

    #[test]
    fn test_kill_switch_short_circuits_to_hold() {
        let (mut orch, _) = orchestrator();
        let calm = flat_candles(25);
        for _ in 0..10 {
            orch.run_pipeline("SOL-USD", &calm, &[], &balance(), 1.0).unwrap();
        }

        let decision = orch
            .run_pipeline("SOL-USD", &violent_candles(), &[], &balance(), 1.0)
            .unwrap();

        assert_eq!(decision.action, TradeAction::Hold);
        assert!(decision.signal.is_none());
        assert!(!decision.risk_approved);
        assert!(!decision.volatility_ok);
        assert_eq!(decision.regime.regime, MarketRegime::HighVolatility);
        assert_eq!(decision.regime.confidence, 0.0);
        assert!(decision.explanation.starts_with("KILL SWITCH"));
        assert!(decision.agent_contributions.risk.is_none());
        assert!(decision.agent_contributions.volatility.kill_switch_active);

        let guard = orch.agent(AgentKind::VolatilityGuard).unwrap();
        assert_eq!(guard.status, AgentStatus::Suspended);

        // Every agent still reports exactly once for the halted cycle
        let messages = orch.messages();
        let cycle = &messages[messages.len() - 4..];
        assert_eq!(cycle[0].from_agent, AgentKind::VolatilityGuard);
        assert_eq!(cycle[0].to_agent, MessageTarget::Broadcast);
        assert!(matches!(
            cycle[0].payload,
            MessagePayload::Command {
                command: AgentCommand::Halt,
                ..
            }
        ));
        let senders: Vec<AgentKind> = cycle.iter().map(|m| m.from_agent).collect();
        assert!(AgentKind::ALL.iter().all(|k| senders.contains(k)));
    }

    #[test]
    fn test_history_bounds_and_fifo_over_1000_runs() {
        let (mut orch, _) = orchestrator();
        let candles = flat_candles(25);

        for i in 0..1_000 {
            let symbol = format!("SYM-{}", i);
            orch.run_pipeline(&symbol, &candles, &[], &balance(), 1.0).unwrap();
            assert!(orch.decision_count() <= 100);
            assert!(orch.message_count() <= 500);
        }

        let decisions = orch.decision_history();
        assert_eq!(decisions.len(), 100);
        assert_eq!(decisions[0].symbol, "SYM-900");
        assert_eq!(decisions[99].symbol, "SYM-999");
        assert!(decisions
            .iter()
            .enumerate()
            .all(|(i, d)| d.symbol == format!("SYM-{}", 900 + i)));

        // 4 messages per run: the last 500 start midway through run 875
        let messages = orch.messages();
        assert_eq!(messages.len(), 500);
        assert_eq!(messages[0].symbol, "SYM-875");
        assert_eq!(messages[0].from_agent, AgentKind::VolatilityGuard);
        assert_eq!(messages[499].symbol, "SYM-999");
        assert_eq!(messages[499].from_agent, AgentKind::StrategyExecutor);
    }

    #[test]
    fn test_stop_keeps_history_and_rejects_runs() {
        let (mut orch, _) = orchestrator();
        orch.run_pipeline("BTC-USD", &flat_candles(25), &[], &balance(), 1.0)
            .unwrap();
        orch.stop();

        assert!(!orch.is_running());
        assert_eq!(orch.decision_history().len(), 1);
        assert_eq!(
            orch.run_pipeline("BTC-USD", &flat_candles(25), &[], &balance(), 1.0),
            Err(PipelineError::Stopped)
        );

        orch.init();
        assert!(orch
            .run_pipeline("BTC-USD", &flat_candles(25), &[], &balance(), 1.0)
            .is_ok());
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut orch, _) = orchestrator();
        orch.run_pipeline("BTC-USD", &flat_candles(25), &[], &balance(), 1.0)
            .unwrap();
        orch.reset();

        assert!(orch.is_running());
        assert!(orch.decision_history().is_empty());
        assert!(orch.messages().is_empty());
        assert!(orch.volatility_history("BTC-USD").is_none());
    }

    #[test]
    fn test_drop_symbol_releases_partition() {
        let (mut orch, clock) = orchestrator();
        orch.run_pipeline("BTC-USD", &flat_candles(25), &[], &balance(), 1.0)
            .unwrap();
        orch.run_pipeline("ETH-USD", &flat_candles(25), &[], &balance(), 1.0)
            .unwrap();
        orch.record_trade("ETH-USD", -100.0, 10_000.0, clock.now());

        assert!(orch.drop_symbol("ETH-USD"));
        assert!(!orch.drop_symbol("ETH-USD"));
        assert!(orch.risk_state("ETH-USD").is_none());
        assert!(orch.volatility_history("ETH-USD").is_none());
        assert_eq!(orch.state().symbols, vec!["BTC-USD".to_string()]);
        assert_eq!(orch.volatility_history("BTC-USD").map(|h| h.len()), Some(1));
        // History is left intact
        assert_eq!(orch.decision_count(), 2);

        // Coming back starts from a clean partition
        orch.run_pipeline("ETH-USD", &flat_candles(25), &[], &balance(), 1.0)
            .unwrap();
        assert_eq!(orch.risk_state("ETH-USD").map(|s| s.consecutive_losses), Some(0));
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let (mut orch, _) = orchestrator();
        let result = orch.run_pipeline("BTC-USD", &[], &[], &balance(), 1.0);
        assert!(matches!(result, Err(PipelineError::InsufficientData(_))));
        assert!(orch.messages().is_empty());
    }

    #[test]
    fn test_cooldown_follows_the_clock() {
        let (mut orch, clock) = orchestrator();
        let candles = uptrend_candles();
        orch.record_trade("BTC-USD", 40.0, 10_000.0, clock.now());

        let cooling = orch
            .run_pipeline("BTC-USD", &candles, &[], &balance(), 5.0)
            .unwrap();
        assert!(!cooling.risk_approved);
        assert_eq!(cooling.action, TradeAction::Hold);
        assert!(cooling.explanation.contains("Cooldown active"));

        clock.advance(Duration::seconds(61));
        let ready = orch
            .run_pipeline("BTC-USD", &candles, &[], &balance(), 5.0)
            .unwrap();
        assert!(ready.risk_approved);
        assert_eq!(ready.action, TradeAction::Buy);
    }

    #[test]
    fn test_risk_state_is_partitioned_per_symbol() {
        let (mut orch, clock) = orchestrator();
        orch.record_trade("BTC-USD", -600.0, 10_000.0, clock.now() - Duration::minutes(10));

        let candles = uptrend_candles();
        let btc = orch
            .run_pipeline("BTC-USD", &candles, &[], &balance(), 5.0)
            .unwrap();
        let eth = orch
            .run_pipeline("ETH-USD", &candles, &[], &balance(), 5.0)
            .unwrap();

        let btc_risk = btc.agent_contributions.risk.as_ref().unwrap();
        assert!(btc_risk.trade_suspended);
        assert_eq!(btc_risk.risk_level, RiskLevel::Critical);
        assert_eq!(btc.action, TradeAction::Hold);

        assert!(eth.risk_approved);
        assert_eq!(eth.action, TradeAction::Buy);
        assert_relative_eq!(orch.risk_state("BTC-USD").unwrap().daily_loss_percent, 6.0, epsilon = 1e-9);
        assert_eq!(orch.risk_state("ETH-USD").unwrap().consecutive_losses, 0);
    }

    #[test]
    fn test_decision_round_trips_through_json() {
        let (mut orch, _) = orchestrator();
        let decision = orch
            .run_pipeline("BTC-USD", &uptrend_candles(), &[], &balance(), 5.0)
            .unwrap();

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["action"], "BUY");
        assert_eq!(json["regime"]["regime"], "TRENDING");
        assert!(json["regime"]["features"]["trendStrength"].is_number());
        assert_eq!(json["agentContributions"]["risk"]["riskLevel"], "LOW");
        assert_eq!(json["agentContributions"]["risk"]["stopLossAdjustment"], "NORMAL");
        assert_eq!(json["signal"]["side"], "BUY");

        let text = serde_json::to_string(&decision).unwrap();
        let back: TradingDecision = serde_json::from_str(&text).unwrap();
        assert_eq!(back.action, decision.action);
        assert_eq!(back.regime.regime, decision.regime.regime);
        let (a, b) = (back.signal.unwrap(), decision.signal.unwrap());
        assert_relative_eq!(a.entry_price, b.entry_price, epsilon = 1e-6);
        assert_relative_eq!(a.stop_loss, b.stop_loss, epsilon = 1e-6);
        assert_relative_eq!(a.take_profit, b.take_profit, epsilon = 1e-6);
        assert_relative_eq!(back.indicators.ema21, decision.indicators.ema21, epsilon = 1e-6);
    }

    #[test]
    fn test_snapshot_and_message_wire_format() {
        let (mut orch, _) = orchestrator();
        orch.run_pipeline("BTC-USD", &uptrend_candles(), &[], &balance(), 5.0)
            .unwrap();

        let snapshot = orch.state();
        assert!(snapshot.is_running);
        assert_eq!(snapshot.symbols, vec!["BTC-USD".to_string()]);
        assert!(snapshot.last_decision.is_some());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["isRunning"], true);
        assert_eq!(json["agents"][0]["type"], "REGIME_DETECTOR");
        assert_eq!(json["messageLog"][0]["type"], "ALERT");
        assert_eq!(json["messageLog"][0]["payload"]["type"], "ALERT");
        assert_eq!(json["messageLog"][1]["payload"]["regime"], "TRENDING");
    }
}
