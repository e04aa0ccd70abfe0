use analysis_core::{AccountBalance, MarketRegime, Position, RegimeClassification};
use chrono::{DateTime, Duration, Utc};

use crate::models::*;

/// Inputs for one risk evaluation
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub regime: &'a RegimeClassification,
    pub current_volatility: f64,
    pub positions: &'a [Position],
    pub balance: &'a AccountBalance,
}

/// Stateful risk throttle for one instrument.
///
/// Every rule narrates a sentence and can only shrink the size multiplier.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    params: RiskParameters,
    state: RiskState,
}

impl RiskEngine {
    pub fn new(params: RiskParameters) -> Self {
        Self {
            params,
            state: RiskState::default(),
        }
    }

    pub fn with_state(params: RiskParameters, state: RiskState) -> Self {
        Self { params, state }
    }

    pub fn parameters(&self) -> &RiskParameters {
        &self.params
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = RiskState::default();
    }

    /// Feed a closed trade back into the counters.
    ///
    /// Losses raise drawdown and the daily loss and extend the losing streak;
    /// wins decay drawdown by 10% and clear the streak. A trade that closed on
    /// an earlier UTC day than the current counter does not touch the daily loss.
    pub fn record_trade(&mut self, outcome: TradeOutcome) {
        self.roll_day(outcome.closed_at);
        let same_day = self.state.trading_day == Some(outcome.closed_at.date_naive());

        let loss_fraction = if outcome.equity > 0.0 {
            outcome.pnl.abs() / outcome.equity
        } else {
            0.0
        };

        if outcome.pnl < 0.0 {
            if same_day {
                self.state.daily_loss_percent += loss_fraction * 100.0;
            }
            self.state.recent_drawdown += loss_fraction;
            self.state.consecutive_losses += 1;
        } else {
            self.state.recent_drawdown *= 0.9;
            self.state.consecutive_losses = 0;
        }

        self.state.last_trade_time = match self.state.last_trade_time {
            Some(last) if last > outcome.closed_at => Some(last),
            _ => Some(outcome.closed_at),
        };

        tracing::info!(
            "Risk engine: recorded trade pnl={:.2} (drawdown {:.2}%, daily loss {:.2}%, losing streak {})",
            outcome.pnl,
            self.state.recent_drawdown * 100.0,
            self.state.daily_loss_percent,
            self.state.consecutive_losses
        );
    }

    /// Evaluate the rules in order and return a fresh decision.
    pub fn evaluate(&mut self, inputs: RiskInputs<'_>, now: DateTime<Utc>) -> RiskDecision {
        self.roll_day(now);

        let p = &self.params;
        let s = &self.state;
        let mut multiplier = 1.0_f64;
        let mut stop_loss_adjustment = StopLossAdjustment::Normal;
        let mut trade_cooldown_active = false;
        let mut trade_suspended = false;
        let mut risk_level = RiskLevel::Low;
        let mut notes: Vec<String> = Vec::new();

        // 1. Regime
        match inputs.regime.regime {
            MarketRegime::HighVolatility => {
                multiplier *= 0.25;
                stop_loss_adjustment = StopLossAdjustment::Tightened;
                notes.push("High-volatility regime: size cut to 25% and stops tightened.".to_string());
            }
            MarketRegime::RangeBound => {
                multiplier *= 0.6;
                notes.push("Range-bound regime: size reduced to 60%.".to_string());
            }
            MarketRegime::Trending => {
                notes.push("Trending regime: full size available.".to_string());
            }
        }

        // 2. Regime confidence
        if inputs.regime.confidence < p.min_regime_confidence {
            multiplier *= 0.7;
            notes.push(format!(
                "Low regime confidence ({:.0}%): size x0.7.",
                inputs.regime.confidence * 100.0
            ));
        }

        // 3. Volatility above threshold
        if p.volatility_threshold > 0.0 && inputs.current_volatility > p.volatility_threshold {
            let excess_ratio = (inputs.current_volatility - p.volatility_threshold) / p.volatility_threshold;
            let cut = (excess_ratio * 0.2).min(0.5);
            multiplier *= 1.0 - cut;
            stop_loss_adjustment = StopLossAdjustment::Tightened;
            notes.push(format!(
                "Volatility {:.2}% above {:.2}% threshold: size -{:.0}%, stops tightened.",
                inputs.current_volatility * 100.0,
                p.volatility_threshold * 100.0,
                cut * 100.0
            ));
        }

        // 4. Drawdown
        if s.recent_drawdown > p.drawdown_floor {
            let cut = (s.recent_drawdown * 5.0).min(0.5);
            multiplier *= 1.0 - cut;
            notes.push(format!(
                "Recent drawdown {:.2}%: size -{:.0}%.",
                s.recent_drawdown * 100.0,
                cut * 100.0
            ));
        }

        // 5. Approaching daily loss limit
        if s.daily_loss_percent >= p.max_daily_loss_percent * p.daily_loss_warning_ratio {
            stop_loss_adjustment = StopLossAdjustment::Tightened;
            risk_level = RiskLevel::High;
            notes.push(format!(
                "Daily loss {:.2}% nearing the {:.2}% limit: stops tightened.",
                s.daily_loss_percent, p.max_daily_loss_percent
            ));
        }

        // 6. Daily loss limit reached
        if s.daily_loss_percent >= p.max_daily_loss_percent {
            trade_suspended = true;
            risk_level = RiskLevel::Critical;
            notes.push(format!(
                "Daily loss limit reached ({:.2}% >= {:.2}%): trading suspended.",
                s.daily_loss_percent, p.max_daily_loss_percent
            ));
        }

        // 7. Cooldown since the last trade
        if let Some(last) = s.last_trade_time {
            let elapsed = now - last;
            if elapsed < Duration::seconds(p.trade_cooldown_secs) {
                trade_cooldown_active = true;
                notes.push(format!(
                    "Cooldown active: last trade {}s ago (minimum {}s).",
                    elapsed.num_seconds().max(0),
                    p.trade_cooldown_secs
                ));
            }
        }

        // 8. Losing streak
        if s.consecutive_losses >= p.max_consecutive_losses {
            trade_cooldown_active = true;
            multiplier *= 0.5;
            notes.push(format!(
                "{} consecutive losses: cooldown enforced and size halved.",
                s.consecutive_losses
            ));
        }

        // 9. Exposure
        let exposure: f64 = inputs.positions.iter().map(Position::notional).sum();
        let position_budget = inputs.balance.equity * p.max_position_percent / 100.0;
        if exposure > p.exposure_utilization_limit * position_budget {
            multiplier *= 0.3;
            risk_level = risk_level.max(RiskLevel::Medium);
            notes.push(format!(
                "Open exposure {:.2} exceeds {:.0}% of the {:.2} position budget: size x0.3.",
                exposure,
                p.exposure_utilization_limit * 100.0,
                position_budget
            ));
        }

        let position_size_multiplier = multiplier.clamp(0.1, 1.0);

        if !trade_suspended && risk_level != RiskLevel::Critical {
            if position_size_multiplier < 0.3 {
                risk_level = risk_level.max(RiskLevel::High);
            } else if position_size_multiplier < 0.7 {
                risk_level = risk_level.max(RiskLevel::Medium);
            }
        }

        notes.push(format!(
            "Position size multiplier {:.2}, risk level {}.",
            position_size_multiplier,
            risk_level.as_str()
        ));

        let decision = RiskDecision {
            position_size_multiplier,
            stop_loss_adjustment,
            trade_cooldown_active,
            trade_suspended,
            risk_level,
            explanation: notes.join(" "),
            timestamp: now,
        };

        if decision.trade_suspended {
            tracing::warn!("Risk engine: trading suspended ({})", decision.explanation);
        } else {
            tracing::debug!("Risk engine: {}", decision.explanation);
        }

        decision
    }

    /// Risk-adjusted size: base scaled by the multiplier, capped by the
    /// per-position budget, and zero while suspended.
    pub fn adjusted_size(&self, decision: &RiskDecision, base_size: f64, equity: f64, price: f64) -> f64 {
        if decision.trade_suspended || price <= 0.0 {
            return 0.0;
        }
        let cap = equity * self.params.max_position_percent / 100.0 / price;
        (base_size * decision.position_size_multiplier).min(cap).max(0.0)
    }

    /// Reset the daily loss counter when the UTC day moves forward
    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        match self.state.trading_day {
            Some(day) if today <= day => {}
            Some(day) => {
                tracing::info!(
                    "Risk engine: new trading day {} (daily loss {:.2}% from {} cleared)",
                    today,
                    self.state.daily_loss_percent,
                    day
                );
                self.state.daily_loss_percent = 0.0;
                self.state.trading_day = Some(today);
            }
            None => self.state.trading_day = Some(today),
        }
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskParameters::default())
    }
}
