use analysis_core::{
    FibonacciLevels, RegimeClassification, StrategyKind, SupportResistance, TechnicalIndicators,
    TradeSide,
};
use serde::{Deserialize, Serialize};

use crate::signal::{FibonacciContext, StrategyOutcome, TechnicalContext, TradeSignal};

const KEY_RETRACEMENTS: [f64; 3] = [38.2, 50.0, 61.8];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySettings {
    /// Minimum momentum for a trend entry (0.005 = 0.5%)
    pub trend_momentum_min: f64,
    pub trend_rsi_max: f64,
    pub trend_stop_atr: f64,
    pub trend_target_atr: f64,
    pub trend_confidence_cap: f64,
    pub oversold: f64,
    pub overbought: f64,
    pub reversion_stop_atr: f64,
    /// Distance to any Fibonacci level that earns the trend bonus
    pub fib_proximity: f64,
    /// Distance to a key retracement that moves the reversion target
    pub fib_key_proximity: f64,
    pub level_proximity: f64,
    pub fib_bonus: f64,
    pub fib_key_bonus: f64,
    pub level_bonus: f64,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            trend_momentum_min: 0.005,
            trend_rsi_max: 75.0,
            trend_stop_atr: 2.0,
            trend_target_atr: 3.0,
            trend_confidence_cap: 0.9,
            oversold: 30.0,
            overbought: 70.0,
            reversion_stop_atr: 1.5,
            fib_proximity: 0.01,
            fib_key_proximity: 0.005,
            level_proximity: 0.01,
            fib_bonus: 0.1,
            fib_key_bonus: 0.15,
            level_bonus: 0.1,
        }
    }
}

/// Regime-conditioned signal generator
#[derive(Debug, Clone, Default)]
pub struct StrategyExecutor {
    settings: StrategySettings,
}

impl StrategyExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: StrategySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    /// Produce a signal for the regime's strategy.
    ///
    /// Nothing is evaluated when the regime maps to no-trade or when risk has
    /// not approved new entries.
    pub fn generate(
        &self,
        symbol: &str,
        regime: &RegimeClassification,
        indicators: &TechnicalIndicators,
        price: f64,
        approved: bool,
    ) -> StrategyOutcome {
        let strategy = regime.regime.strategy();

        let outcome = match strategy {
            StrategyKind::NoTrade => StrategyOutcome::none(
                strategy,
                format!("{} regime maps to no-trade; no signal generated.", regime.regime.name()),
            ),
            _ if !approved => StrategyOutcome::none(
                strategy,
                format!(
                    "Risk engine did not approve new entries; {} skipped.",
                    strategy.name()
                ),
            ),
            StrategyKind::TrendFollowing => self.trend_following(symbol, indicators, price),
            StrategyKind::MeanReversion => self.mean_reversion(symbol, indicators, price),
        };

        match &outcome.signal {
            Some(signal) => tracing::debug!(
                "Strategy executor: {} {} {} @ {:.4} (confidence {:.2})",
                strategy.name(),
                signal.side.as_str(),
                symbol,
                signal.entry_price,
                signal.confidence
            ),
            None => tracing::debug!("Strategy executor: {} ({})", symbol, outcome.reason),
        }

        outcome
    }

    fn trend_following(&self, symbol: &str, ind: &TechnicalIndicators, price: f64) -> StrategyOutcome {
        let s = &self.settings;
        let strategy = StrategyKind::TrendFollowing;

        let bullish = ind.ema9 > ind.ema21;
        if !(bullish && ind.momentum > s.trend_momentum_min && ind.rsi <= s.trend_rsi_max) {
            return StrategyOutcome::none(
                strategy,
                format!(
                    "Trend entry conditions not met (EMA9 {:.4} vs EMA21 {:.4}, momentum {:.2}%, RSI {:.1}).",
                    ind.ema9,
                    ind.ema21,
                    ind.momentum * 100.0,
                    ind.rsi
                ),
            );
        }

        // The gate admits only the bullish case; the SELL arm is dormant.
        let side = if bullish { TradeSide::Buy } else { TradeSide::Sell };
        let (stop_loss, take_profit) = match side {
            TradeSide::Buy => (price - s.trend_stop_atr * ind.atr, price + s.trend_target_atr * ind.atr),
            TradeSide::Sell => (price + s.trend_stop_atr * ind.atr, price - s.trend_target_atr * ind.atr),
        };

        let spread = if ind.ema21 > 0.0 {
            (ind.ema9 - ind.ema21).abs() / ind.ema21
        } else {
            0.0
        };
        let mut confidence = (spread * 20.0).min(s.trend_confidence_cap);
        let mut reasons = vec![
            format!("EMA9 {:.4} above EMA21 {:.4}", ind.ema9, ind.ema21),
            format!("Momentum {:.2}%", ind.momentum * 100.0),
            format!("RSI {:.1} not overbought", ind.rsi),
        ];

        let mut fibonacci_context = None;
        if let Some((level, distance)) = ind.fibonacci_levels.as_ref().and_then(|f| f.nearest(price)) {
            if distance < s.fib_proximity {
                confidence += s.fib_bonus;
                reasons.push(format!("Price within {:.2}% of the {:.1}% Fibonacci level", distance * 100.0, level.ratio));
            }
            fibonacci_context = Some(FibonacciContext {
                nearest_ratio: level.ratio,
                nearest_price: level.price,
                distance,
                target_from_fibonacci: false,
            });
        }

        self.signal(
            symbol,
            side,
            strategy,
            price,
            (stop_loss, take_profit),
            confidence,
            reasons,
            fibonacci_context,
            ind,
        )
    }

    fn mean_reversion(&self, symbol: &str, ind: &TechnicalIndicators, price: f64) -> StrategyOutcome {
        let s = &self.settings;
        let strategy = StrategyKind::MeanReversion;

        let (side, mut confidence, mut reasons) = if ind.rsi < s.oversold {
            (
                TradeSide::Buy,
                (s.oversold - ind.rsi) / 30.0,
                vec![format!("RSI {:.1} oversold", ind.rsi)],
            )
        } else if ind.rsi > s.overbought {
            (
                TradeSide::Sell,
                (ind.rsi - s.overbought) / 30.0,
                vec![format!("RSI {:.1} overbought", ind.rsi)],
            )
        } else {
            return StrategyOutcome::none(
                strategy,
                format!("RSI {:.1} inside the {:.0}-{:.0} band; no reversion entry.", ind.rsi, s.oversold, s.overbought),
            );
        };

        let stop_loss = match side {
            TradeSide::Buy => price - s.reversion_stop_atr * ind.atr,
            TradeSide::Sell => price + s.reversion_stop_atr * ind.atr,
        };
        let mut take_profit = ind.ema21;
        reasons.push(format!("Targeting EMA21 {:.4}", ind.ema21));

        let mut fibonacci_context = None;
        if let Some(fib) = ind.fibonacci_levels.as_ref() {
            if let Some((ratio, level_price, distance)) = key_retracement_near(fib, price, s.fib_key_proximity) {
                confidence += s.fib_key_bonus;
                reasons.push(format!("Price at the {:.1}% retracement ({:.4})", ratio, level_price));

                let target = retracement_target(fib, ratio, side, price);
                if let Some(target) = target {
                    take_profit = target;
                    reasons.push(format!("Target moved to Fibonacci level {:.4}", target));
                }
                fibonacci_context = Some(FibonacciContext {
                    nearest_ratio: ratio,
                    nearest_price: level_price,
                    distance,
                    target_from_fibonacci: target.is_some(),
                });
            }
        }

        if let Some(sr) = ind.support_resistance.as_ref() {
            if let Some(level) = level_near(sr, side, price, s.level_proximity) {
                confidence += s.level_bonus;
                let label = match side {
                    TradeSide::Buy => "support",
                    TradeSide::Sell => "resistance",
                };
                reasons.push(format!("Price within {:.0}% of {} at {:.4}", s.level_proximity * 100.0, label, level));
            }
        }

        self.signal(
            symbol,
            side,
            strategy,
            price,
            (stop_loss, take_profit),
            confidence,
            reasons,
            fibonacci_context,
            ind,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn signal(
        &self,
        symbol: &str,
        side: TradeSide,
        strategy: StrategyKind,
        entry_price: f64,
        (stop_loss, take_profit): (f64, f64),
        confidence: f64,
        reasons: Vec<String>,
        fibonacci_context: Option<FibonacciContext>,
        ind: &TechnicalIndicators,
    ) -> StrategyOutcome {
        let signal = TradeSignal {
            symbol: symbol.to_string(),
            side,
            strategy,
            entry_price,
            stop_loss,
            take_profit,
            size: 0.0,
            confidence: confidence.clamp(0.0, 1.0),
            reasons,
            fibonacci_context,
            technical_context: Some(TechnicalContext::from(ind)),
        };

        let reason = format!(
            "{} {} signal: {} (confidence {:.0}%).",
            strategy.name(),
            side.as_str(),
            signal.reasons.join("; "),
            signal.confidence * 100.0
        );

        StrategyOutcome {
            strategy,
            signal: Some(signal),
            reason,
        }
    }
}

/// Closest of the 38.2 / 50 / 61.8 retracements within `proximity`
fn key_retracement_near(fib: &FibonacciLevels, price: f64, proximity: f64) -> Option<(f64, f64, f64)> {
    if price <= 0.0 {
        return None;
    }
    KEY_RETRACEMENTS
        .iter()
        .filter_map(|&ratio| fib.level(ratio).map(|p| (ratio, p, (price - p).abs() / price)))
        .filter(|&(_, _, d)| d < proximity)
        .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
}

/// Reversion target on a retracement: the 50% level, or 38.2% when price is
/// already sitting on 50%. Dropped unless it lies on the profitable side.
fn retracement_target(fib: &FibonacciLevels, at_ratio: f64, side: TradeSide, price: f64) -> Option<f64> {
    let ratio = if (at_ratio - 50.0).abs() < 1e-9 { 38.2 } else { 50.0 };
    let target = fib.level(ratio)?;
    let profitable = match side {
        TradeSide::Buy => target > price,
        TradeSide::Sell => target < price,
    };
    profitable.then_some(target)
}

fn level_near(sr: &SupportResistance, side: TradeSide, price: f64, proximity: f64) -> Option<f64> {
    if price <= 0.0 {
        return None;
    }
    let levels = match side {
        TradeSide::Buy => &sr.support,
        TradeSide::Sell => &sr.resistance,
    };
    levels
        .iter()
        .map(|l| l.price)
        .find(|p| (price - p).abs() / price <= proximity)
}
