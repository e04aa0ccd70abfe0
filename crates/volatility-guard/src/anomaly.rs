use analysis_core::stats::mean;
use analysis_core::Candle;
use serde::{Deserialize, Serialize};

use crate::VolatilityGuardConfig;

/// Single-candle market anomaly, in detection precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    VolumeSurge,
    AbnormalRange,
    FlashMove,
}

impl AnomalyKind {
    pub fn description(&self) -> &'static str {
        match self {
            AnomalyKind::VolumeSurge => "volume surge",
            AnomalyKind::AbnormalRange => "abnormal range",
            AnomalyKind::FlashMove => "flash move",
        }
    }
}

/// Check the latest candle against the rest of the window.
///
/// The first matching test wins. Averages are taken over the candles before
/// the latest one, so the candle under test does not dilute its own baseline.
pub fn detect_anomaly(candles: &[Candle], config: &VolatilityGuardConfig) -> Option<AnomalyKind> {
    if candles.len() < config.anomaly_min_candles.max(2) {
        return None;
    }

    let (latest, prior) = candles.split_last()?;

    let avg_volume = mean(&prior.iter().map(|c| c.volume).collect::<Vec<_>>());
    // Inclusive: an exact tripling of volume counts as a surge
    if avg_volume > 0.0 && latest.volume >= config.volume_surge_multiple * avg_volume {
        return Some(AnomalyKind::VolumeSurge);
    }

    let avg_range = mean(&prior.iter().map(Candle::range_ratio).collect::<Vec<_>>());
    if avg_range > 0.0 && latest.range_ratio() > config.range_multiple * avg_range {
        return Some(AnomalyKind::AbnormalRange);
    }

    if latest.body_ratio() > config.flash_move_fraction {
        return Some(AnomalyKind::FlashMove);
    }

    None
}
