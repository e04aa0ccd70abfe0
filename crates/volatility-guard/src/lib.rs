//! Rolling volatility guard.
//!
//! Keeps a bounded history of per-cycle volatility readings, flags spikes
//! against that history, flags single-candle anomalies in the current window,
//! and trips the kill switch only when both fire in the same evaluation.

pub mod anomaly;

use std::collections::VecDeque;

use analysis_core::stats::{tail, z_score_of};
use analysis_core::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use anomaly::{detect_anomaly, AnomalyKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityGuardConfig {
    pub volatility_threshold: f64,
    /// Ring capacity for the rolling history
    pub history_capacity: usize,
    /// History points required before spike detection runs
    pub min_history: usize,
    /// Readings used for the spike baseline
    pub baseline_window: usize,
    pub spike_z_score: f64,
    /// A reading above this multiple of the threshold is a spike on its own
    pub spike_threshold_multiple: f64,
    pub anomaly_min_candles: usize,
    pub volume_surge_multiple: f64,
    pub range_multiple: f64,
    /// Single-candle body move, as a fraction of the open
    pub flash_move_fraction: f64,
}

impl Default for VolatilityGuardConfig {
    fn default() -> Self {
        Self {
            volatility_threshold: 0.03,
            history_capacity: 100,
            min_history: 10,
            baseline_window: 20,
            spike_z_score: 2.0,
            spike_threshold_multiple: 2.0,
            anomaly_min_candles: 20,
            volume_surge_multiple: 3.0,
            range_multiple: 3.0,
            flash_move_fraction: 0.03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityStatus {
    pub spike_detected: bool,
    pub anomaly_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyKind>,
    pub kill_switch_active: bool,
    pub current_volatility: f64,
    pub volatility_threshold: f64,
    /// Z-score of the reading against the prior baseline (0 before warm-up)
    pub z_score: f64,
    pub timestamp: DateTime<Utc>,
}

impl VolatilityStatus {
    /// Anything worth reporting in the decision explanation
    pub fn is_abnormal(&self) -> bool {
        self.spike_detected || self.anomaly_detected
    }

    pub fn describe(&self) -> String {
        let reading = format!(
            "volatility {:.2}% vs threshold {:.2}%",
            self.current_volatility * 100.0,
            self.volatility_threshold * 100.0
        );

        match (self.spike_detected, &self.anomaly) {
            (true, Some(kind)) => format!(
                "KILL SWITCH: volatility spike (z={:.2}) together with {} ({}).",
                self.z_score,
                kind.description(),
                reading
            ),
            (true, None) => format!(
                "Volatility spike detected (z={:.2}, {}).",
                self.z_score, reading
            ),
            (false, Some(kind)) => format!("Market anomaly detected: {} ({}).", kind.description(), reading),
            (false, None) => format!("Volatility normal ({}).", reading),
        }
    }
}

/// Stateful guard owning the volatility history for one instrument
#[derive(Debug, Clone)]
pub struct VolatilityGuard {
    config: VolatilityGuardConfig,
    history: VecDeque<f64>,
}

impl VolatilityGuard {
    pub fn new(config: VolatilityGuardConfig) -> Self {
        let capacity = config.history_capacity;
        Self {
            config,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &VolatilityGuardConfig {
        &self.config
    }

    /// History oldest-first
    pub fn history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Evaluate the current reading and window, then record the reading.
    pub fn evaluate(
        &mut self,
        current_volatility: f64,
        candles: &[Candle],
        timestamp: DateTime<Utc>,
    ) -> VolatilityStatus {
        let (spike_detected, z_score) = self.detect_spike(current_volatility);
        let anomaly = detect_anomaly(candles, &self.config);
        let anomaly_detected = anomaly.is_some();
        let kill_switch_active = spike_detected && anomaly_detected;

        self.record(current_volatility);

        let status = VolatilityStatus {
            spike_detected,
            anomaly_detected,
            anomaly,
            kill_switch_active,
            current_volatility,
            volatility_threshold: self.config.volatility_threshold,
            z_score,
            timestamp,
        };

        if kill_switch_active {
            tracing::warn!("Volatility guard: {}", status.describe());
        } else if status.is_abnormal() {
            tracing::info!("Volatility guard: {}", status.describe());
        } else {
            tracing::debug!("Volatility guard: {}", status.describe());
        }

        status
    }

    /// Spike test against the readings recorded before this one
    fn detect_spike(&self, current: f64) -> (bool, f64) {
        if self.history.len() < self.config.min_history {
            return (false, 0.0);
        }

        let readings: Vec<f64> = self.history.iter().copied().collect();
        let baseline = tail(&readings, self.config.baseline_window);
        let z = z_score_of(current, baseline);

        let spike = z > self.config.spike_z_score
            || current > self.config.spike_threshold_multiple * self.config.volatility_threshold;
        (spike, z)
    }

    fn record(&mut self, reading: f64) {
        if self.config.history_capacity == 0 {
            return;
        }
        while self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(reading);
    }
}

impl Default for VolatilityGuard {
    fn default() -> Self {
        Self::new(VolatilityGuardConfig::default())
    }
}
