use analysis_core::stats::mean;
use analysis_core::{
    Candle, FibonacciLevel, FibonacciLevels, PriceLevel, SupportResistance, SwingDirection,
    SwingKind, SwingPoint,
};

/// Standard retracement ratios, in percent
pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 23.6, 38.2, 50.0, 61.8, 78.6, 100.0];

/// Find swing highs and lows.
///
/// A candle is a swing high when its high is strictly above every other high
/// within `lookback` candles on either side (swing lows mirror this on lows).
/// Returned in window order.
pub fn swing_points(bars: &[Candle], lookback: usize) -> Vec<SwingPoint> {
    if lookback == 0 || bars.len() < lookback * 2 + 1 {
        return vec![];
    }

    let mut points = Vec::new();

    for i in lookback..bars.len() - lookback {
        let neighbors = bars[i - lookback..=i + lookback]
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != lookback)
            .map(|(_, b)| b);

        let (highs, lows): (Vec<f64>, Vec<f64>) = neighbors.map(|b| (b.high, b.low)).unzip();
        let bar = &bars[i];

        if highs.iter().all(|&h| bar.high > h) {
            let avg = mean(&highs);
            let strength = if avg > 0.0 { (bar.high - avg) / avg } else { 0.0 };
            points.push(SwingPoint {
                index: i,
                kind: SwingKind::High,
                price: bar.high,
                timestamp: bar.timestamp,
                strength: strength.clamp(0.1, 1.0),
            });
        }

        if lows.iter().all(|&l| bar.low < l) {
            let avg = mean(&lows);
            let strength = if avg > 0.0 { (avg - bar.low) / avg } else { 0.0 };
            points.push(SwingPoint {
                index: i,
                kind: SwingKind::Low,
                price: bar.low,
                timestamp: bar.timestamp,
                strength: strength.clamp(0.1, 1.0),
            });
        }
    }

    points
}

/// Retracement levels from the most recent swing high / swing low pair
pub fn fibonacci_levels(points: &[SwingPoint]) -> Option<FibonacciLevels> {
    let last_high = points.iter().rev().find(|p| p.kind == SwingKind::High)?;
    let last_low = points.iter().rev().find(|p| p.kind == SwingKind::Low)?;

    let range = last_high.price - last_low.price;
    if range <= 0.0 {
        return None;
    }

    // Levels are measured back from the leg's endpoint
    let direction = if last_low.index < last_high.index {
        SwingDirection::Up
    } else {
        SwingDirection::Down
    };

    let levels = FIBONACCI_RATIOS
        .iter()
        .map(|&ratio| {
            let offset = range * ratio / 100.0;
            let price = match direction {
                SwingDirection::Up => last_high.price - offset,
                SwingDirection::Down => last_low.price + offset,
            };
            FibonacciLevel { ratio, price }
        })
        .collect();

    Some(FibonacciLevels {
        swing_high: last_high.price,
        swing_low: last_low.price,
        direction,
        levels,
    })
}

/// Cluster swing prices that sit within `tolerance` (relative) of each other.
pub fn cluster_levels(points: &[SwingPoint], tolerance: f64) -> Vec<PriceLevel> {
    let mut prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut levels: Vec<PriceLevel> = Vec::new();
    let mut members: Vec<f64> = Vec::new();

    for price in prices {
        if !members.is_empty() {
            let center = mean(&members);
            if center > 0.0 && (price - center).abs() / center > tolerance {
                levels.push(PriceLevel { price: center, touches: members.len() });
                members.clear();
            }
        }
        members.push(price);
    }

    if !members.is_empty() {
        levels.push(PriceLevel { price: mean(&members), touches: members.len() });
    }

    levels
}

/// Nearest clustered levels below (support) and above (resistance) the price
pub fn support_resistance(
    points: &[SwingPoint],
    current_price: f64,
    tolerance: f64,
    max_levels: usize,
) -> SupportResistance {
    let levels = cluster_levels(points, tolerance);

    // Clusters come out ascending, so resistance is already nearest-first
    let resistance: Vec<PriceLevel> = levels
        .iter()
        .filter(|l| l.price > current_price)
        .take(max_levels)
        .cloned()
        .collect();

    let support: Vec<PriceLevel> = levels
        .iter()
        .rev()
        .filter(|l| l.price < current_price)
        .take(max_levels)
        .cloned()
        .collect();

    SupportResistance { support, resistance }
}
