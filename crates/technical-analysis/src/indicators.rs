use analysis_core::stats::{mean, population_std_dev, simple_returns, tail};
use analysis_core::Candle;

/// Exponential Moving Average, final value only.
///
/// Seeded with the simple average of the first `period` closes, then smoothed
/// across the remaining closes. With fewer than `period` closes the last close
/// is returned as-is.
pub fn ema(data: &[f64], period: usize) -> f64 {
    let Some(&last) = data.last() else {
        return 0.0;
    };
    if period == 0 || data.len() < period {
        return last;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = mean(&data[..period]);

    data[period..]
        .iter()
        .fold(seed, |prev, &close| (close - prev) * multiplier + prev)
}

/// Relative Strength Index over the last `period` deltas (simple averages).
///
/// Returns 50 when there are not enough closes, 100 when there were no losses.
pub fn rsi(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return 50.0;
    }

    let recent = tail(data, period + 1);
    let mut gains = 0.0;
    let mut losses = 0.0;

    for w in recent.windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// True range of `bar` against the previous close
pub fn true_range(bar: &Candle, prev_close: f64) -> f64 {
    let high_low = bar.high - bar.low;
    let high_close = (bar.high - prev_close).abs();
    let low_close = (bar.low - prev_close).abs();
    high_low.max(high_close).max(low_close)
}

/// Average True Range: mean true range over the last `period` intervals
pub fn atr(bars: &[Candle], period: usize) -> f64 {
    if period == 0 || bars.len() < 2 {
        return 0.0;
    }

    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| true_range(&w[1], w[0].close))
        .collect();

    mean(tail(&true_ranges, period))
}

/// Standard deviation of the last `period` simple returns
pub fn volatility(closes: &[f64], period: usize) -> f64 {
    let returns = simple_returns(tail(closes, period + 1));
    population_std_dev(&returns)
}

/// Relative change from the first to the last close of the trailing
/// `period`-candle window
pub fn momentum(closes: &[f64], period: usize) -> f64 {
    if period < 2 || closes.len() < period {
        return 0.0;
    }
    let last = closes[closes.len() - 1];
    let base = closes[closes.len() - period];
    if base == 0.0 {
        return 0.0;
    }
    (last - base) / base
}

/// Normalised EMA spread, |fast - slow| / slow * 10, clamped to 1
pub fn trend_strength(ema_fast: f64, ema_slow: f64) -> f64 {
    if ema_slow == 0.0 {
        return 0.0;
    }
    ((ema_fast - ema_slow).abs() / ema_slow * 10.0).min(1.0)
}

/// Volume-Weighted Average Price of closes over the window
pub fn vwap(bars: &[Candle]) -> Option<f64> {
    let total_volume: f64 = bars.iter().map(|b| b.volume).sum();
    if total_volume <= 0.0 {
        return None;
    }
    let weighted: f64 = bars.iter().map(|b| b.close * b.volume).sum();
    Some(weighted / total_volume)
}
