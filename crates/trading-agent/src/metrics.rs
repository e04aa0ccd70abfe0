use std::time::{Duration, Instant};

use agent_orchestrator::{TradeAction, TradingDecision};
use dashmap::DashMap;

/// Counters for one symbol's worker
#[derive(Debug, Clone, Default)]
pub struct SymbolMetrics {
    pub cycles_run: u64,
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    pub exits: u64,
    pub kill_switch_trips: u64,
    pub risk_rejections: u64,
    pub errors: u64,
    pub last_cycle_ms: u64,
    pub last_action: Option<TradeAction>,
}

/// Per-symbol telemetry shared by all workers.
pub struct AgentMetrics {
    symbols: DashMap<String, SymbolMetrics>,
    log_interval_cycles: u64,
}

impl AgentMetrics {
    pub fn new(log_interval_cycles: u64) -> Self {
        Self {
            symbols: DashMap::new(),
            log_interval_cycles,
        }
    }

    pub fn start_timer() -> Instant {
        Instant::now()
    }

    pub fn record_decision(&self, decision: &TradingDecision, cycle_start: Instant) {
        let snapshot = {
            let mut entry = self.symbols.entry(decision.symbol.clone()).or_default();
            entry.cycles_run += 1;
            entry.last_cycle_ms = elapsed_ms(cycle_start.elapsed());
            entry.last_action = Some(decision.action);
            match decision.action {
                TradeAction::Buy => entry.buys += 1,
                TradeAction::Sell => entry.sells += 1,
                TradeAction::Hold => entry.holds += 1,
                TradeAction::Exit => entry.exits += 1,
            }
            if decision.agent_contributions.volatility.kill_switch_active {
                entry.kill_switch_trips += 1;
            } else if !decision.risk_approved {
                entry.risk_rejections += 1;
            }
            entry.clone()
        };

        // Emit structured metrics periodically
        if self.log_interval_cycles > 0 && snapshot.cycles_run % self.log_interval_cycles == 0 {
            log_symbol(&decision.symbol, &snapshot);
        }
    }

    pub fn record_error(&self, symbol: &str) {
        self.symbols.entry(symbol.to_string()).or_default().errors += 1;
    }

    pub fn get(&self, symbol: &str) -> Option<SymbolMetrics> {
        self.symbols.get(symbol).map(|m| m.clone())
    }

    pub fn total_cycles(&self) -> u64 {
        self.symbols.iter().map(|m| m.cycles_run).sum()
    }

    /// Emit one summary line per symbol
    pub fn log_metrics(&self) {
        let mut symbols: Vec<(String, SymbolMetrics)> = self
            .symbols
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        for (symbol, metrics) in &symbols {
            log_symbol(symbol, metrics);
        }
    }

    /// Serialize metrics to JSON for the shutdown report
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for entry in self.symbols.iter() {
            let m = entry.value();
            map.insert(
                entry.key().clone(),
                serde_json::json!({
                    "cycles_run": m.cycles_run,
                    "buys": m.buys,
                    "sells": m.sells,
                    "holds": m.holds,
                    "exits": m.exits,
                    "kill_switch_trips": m.kill_switch_trips,
                    "risk_rejections": m.risk_rejections,
                    "errors": m.errors,
                }),
            );
        }
        serde_json::Value::Object(map)
    }
}

fn log_symbol(symbol: &str, m: &SymbolMetrics) {
    tracing::info!(
        symbol = symbol,
        cycles = m.cycles_run,
        buys = m.buys,
        sells = m.sells,
        holds = m.holds,
        kill_switch_trips = m.kill_switch_trips,
        risk_rejections = m.risk_rejections,
        errors = m.errors,
        last_cycle_ms = m.last_cycle_ms,
        "Symbol metrics summary"
    );
}

fn elapsed_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
