#[cfg(test)]
mod tests {
    use super::super::engine::*;
    use super::super::indicators::*;
    use super::super::structure::*;
    use analysis_core::{Candle, SwingDirection, SwingKind, SwingPoint, TechnicalIndicators};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c + 1.0, c - 1.0, c, 1_000.0))
            .collect()
    }

    fn swing(index: usize, kind: SwingKind, price: f64) -> SwingPoint {
        SwingPoint {
            index,
            kind,
            price,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            strength: 0.5,
        }
    }

    #[test]
    fn test_short_window_is_neutral() {
        let engine = IndicatorEngine::new();
        for len in [0usize, 1, 5, 20] {
            let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64 * 3.0).collect();
            let snapshot = engine.compute(&bars_from_closes(&closes));
            assert_eq!(snapshot, TechnicalIndicators::neutral(), "len {}", len);
        }
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, 14), 100.0);
    }

    #[test]
    fn test_rsi_mixed_moves() {
        // 7 gains of 2 and 7 losses of 1: RS = 2, RSI = 66.67
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        assert_relative_eq!(rsi(&closes, 14), 200.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 14), 50.0);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        // seed 23, then 24, then 25
        assert_relative_eq!(ema(&data, 3), 25.0);
        assert_relative_eq!(ema(&data[..3], 3), 23.0);
    }

    #[test]
    fn test_ema_short_series_returns_last_close() {
        assert_eq!(ema(&[5.0, 6.0], 9), 6.0);
        assert_eq!(ema(&[], 9), 0.0);
    }

    #[test]
    fn test_atr_constant_range() {
        let closes = vec![100.0; 30];
        let bars = bars_from_closes(&closes);
        assert_relative_eq!(atr(&bars, 14), 2.0);
    }

    #[test]
    fn test_atr_uses_gap_from_previous_close() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            bar(1, 105.0, 106.0, 104.0, 105.0, 1.0),
        ];
        // |106 - 100| beats the 2-point intrabar range
        assert_relative_eq!(atr(&bars, 14), 6.0);
    }

    #[test]
    fn test_volatility_and_momentum() {
        let flat = vec![100.0; 30];
        assert_eq!(volatility(&flat, 14), 0.0);

        // Ten candles, 100 through 109: first to last close of the window
        let rising: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        assert_relative_eq!(momentum(&rising, 10), 0.09);
        let longer: Vec<f64> = (0..=10).map(|i| 100.0 + i as f64).collect();
        assert_relative_eq!(momentum(&longer, 10), 9.0 / 101.0);
        assert_eq!(momentum(&rising[..5], 10), 0.0);

        let choppy: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 102.0 }).collect();
        assert!(volatility(&choppy, 14) > 0.009);
    }

    #[test]
    fn test_trend_strength_clamped() {
        assert_relative_eq!(trend_strength(10.1, 10.0), 0.1, epsilon = 1e-9);
        assert_eq!(trend_strength(12.0, 10.0), 1.0);
        assert_eq!(trend_strength(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let bars = vec![
            bar(0, 10.0, 10.5, 9.5, 10.0, 1.0),
            bar(1, 20.0, 20.5, 19.5, 20.0, 3.0),
        ];
        assert_relative_eq!(vwap(&bars).unwrap(), 17.5);

        let no_volume = vec![bar(0, 10.0, 10.5, 9.5, 10.0, 0.0)];
        assert!(vwap(&no_volume).is_none());
    }

    #[test]
    fn test_swing_high_detection_and_strength() {
        let highs = [10.0, 11.0, 12.0, 13.0, 14.0, 20.0, 14.0, 13.0, 12.0, 11.0, 10.0];
        let bars: Vec<Candle> = highs
            .iter()
            .enumerate()
            .map(|(i, &h)| bar(i, h - 0.5, h, h - 1.0, h - 0.5, 1.0))
            .collect();

        let points = swing_points(&bars, 5);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, 5);
        assert_eq!(points[0].kind, SwingKind::High);
        assert_eq!(points[0].price, 20.0);
        // neighbours average 12 -> (20 - 12) / 12
        assert_relative_eq!(points[0].strength, 8.0 / 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_swing_requires_strict_extreme() {
        // Flat highs: nothing strictly above its neighbours
        let bars = bars_from_closes(&vec![100.0; 15]);
        assert!(swing_points(&bars, 5).is_empty());
    }

    #[test]
    fn test_fibonacci_up_leg() {
        let points = vec![swing(3, SwingKind::Low, 90.0), swing(10, SwingKind::High, 110.0)];
        let fib = fibonacci_levels(&points).unwrap();

        assert_eq!(fib.direction, SwingDirection::Up);
        assert_eq!(fib.levels.len(), 7);
        assert_relative_eq!(fib.level(0.0).unwrap(), 110.0);
        assert_relative_eq!(fib.level(50.0).unwrap(), 100.0);
        assert_relative_eq!(fib.level(38.2).unwrap(), 102.36, epsilon = 1e-9);
        assert_relative_eq!(fib.level(100.0).unwrap(), 90.0);
    }

    #[test]
    fn test_fibonacci_down_leg_and_missing_pair() {
        let points = vec![swing(3, SwingKind::High, 110.0), swing(10, SwingKind::Low, 90.0)];
        let fib = fibonacci_levels(&points).unwrap();
        assert_eq!(fib.direction, SwingDirection::Down);
        assert_relative_eq!(fib.level(23.6).unwrap(), 94.72, epsilon = 1e-9);

        let only_highs = vec![swing(3, SwingKind::High, 110.0)];
        assert!(fibonacci_levels(&only_highs).is_none());
    }

    #[test]
    fn test_support_resistance_clusters() {
        let points = vec![
            swing(1, SwingKind::Low, 100.0),
            swing(4, SwingKind::Low, 101.0),
            swing(6, SwingKind::High, 150.0),
            swing(8, SwingKind::High, 180.0),
            swing(9, SwingKind::Low, 60.0),
        ];

        let levels = cluster_levels(&points, 0.02);
        assert_eq!(levels.len(), 4);
        assert_relative_eq!(levels[1].price, 100.5);
        assert_eq!(levels[1].touches, 2);

        let sr = support_resistance(&points, 120.0, 0.02, 3);
        assert_eq!(sr.support.len(), 2);
        assert_relative_eq!(sr.support[0].price, 100.5);
        assert_relative_eq!(sr.support[1].price, 60.0);
        assert_eq!(sr.resistance.len(), 2);
        assert_relative_eq!(sr.resistance[0].price, 150.0);

        let capped = support_resistance(&points, 200.0, 0.02, 3);
        assert_eq!(capped.support.len(), 3);
        assert!(capped.resistance.is_empty());
    }

    #[test]
    fn test_engine_full_snapshot() {
        // Zigzag around an uptrend so swings exist on both sides
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + i as f64 * 0.2 + ((i as f64) * 0.7).sin() * 3.0)
            .collect();
        let snapshot = IndicatorEngine::new().compute(&bars_from_closes(&closes));

        assert!(snapshot.atr > 0.0);
        assert!(snapshot.rsi >= 0.0 && snapshot.rsi <= 100.0);
        assert!(snapshot.trend_strength >= 0.0 && snapshot.trend_strength <= 1.0);
        assert_relative_eq!(snapshot.vwap.unwrap(), closes.iter().sum::<f64>() / 60.0, epsilon = 1e-9);
        assert!(snapshot.swing_points.is_some());
        assert!(snapshot.fibonacci_levels.is_some());
        assert!(snapshot.support_resistance.is_some());
    }

    proptest! {
        #[test]
        fn rsi_stays_in_bounds(closes in prop::collection::vec(1.0f64..10_000.0, 0..80)) {
            let value = rsi(&closes, 14);
            prop_assert!((0.0..=100.0).contains(&value));
        }

        #[test]
        fn trend_strength_stays_in_unit_range(fast in 1.0f64..1_000.0, slow in 1.0f64..1_000.0) {
            let value = trend_strength(fast, slow);
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}
