use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::peaks::PeakCandidate;
use crate::config::DetectorConfig;

/// Running levels of the adaptive threshold. Zeroed on construction and reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    pub signal_peak_value: f64,
    pub noise_peak_value: f64,
    pub threshold_value: f64,
    pub samples_since_last_detection: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Still inside the refractory period; candidates were not looked at.
    Refractory,
    /// Eligible, but no fresh candidate this pass.
    Idle,
    Signal(PeakCandidate),
    Noise(PeakCandidate),
}

/// Signal/noise level tracker with refractory gating.
pub struct ThresholdEngine {
    state: DetectorState,
    refractory_period: usize,
    signal_factor: f64,
    noise_factor: f64,
    weight: f64,
}

fn ema(factor: f64, sample: f64, old: f64) -> f64 {
    factor * sample + (1.0 - factor) * old
}

impl ThresholdEngine {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            state: DetectorState::default(),
            refractory_period: config.refractory_period,
            signal_factor: config.signal_ema_factor,
            noise_factor: config.noise_ema_factor,
            weight: config.signal_noise_weight,
        }
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = DetectorState::default();
    }

    /// Advances one pass. `candidates` must be in ascending index order; only
    /// the most recent one is classified, earlier ones are ignored.
    pub fn update(&mut self, candidates: &[PeakCandidate]) -> Classification {
        let state = &mut self.state;
        state.samples_since_last_detection += 1;

        if state.samples_since_last_detection <= self.refractory_period {
            return Classification::Refractory;
        }
        let Some(&peak) = candidates.last() else {
            return Classification::Idle;
        };

        let classification = if peak.value > state.threshold_value {
            state.samples_since_last_detection = 0;
            state.signal_peak_value = ema(self.signal_factor, peak.value, state.signal_peak_value);
            Classification::Signal(peak)
        } else {
            state.noise_peak_value = ema(self.noise_factor, peak.value, state.noise_peak_value);
            trace!(
                "Noise peak {:.4} at {} (threshold {:.4})",
                peak.value,
                peak.index,
                state.threshold_value
            );
            Classification::Noise(peak)
        };

        state.threshold_value = state.noise_peak_value
            + self.weight * (state.signal_peak_value - state.noise_peak_value);

        if let Classification::Signal(peak) = classification {
            debug!(
                "Signal peak {:.4} at {}, levels signal={:.4} noise={:.4} threshold={:.4}",
                peak.value,
                peak.index,
                state.signal_peak_value,
                state.noise_peak_value,
                state.threshold_value
            );
        }
        classification
    }
}
