use std::path::Path;

use knuffel::Decode;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Every tunable of the detection pipeline. Fixed for the lifetime of a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub sample_rate: f64,
    pub window_capacity: usize,
    pub filter_low_cutoff: f64,
    pub filter_high_cutoff: f64,
    pub filter_order: usize,
    pub integration_window: usize,
    pub peak_spacing: usize,
    pub peak_amplitude_floor: f64,
    pub refractory_period: usize,
    pub detection_window: usize,
    pub signal_ema_factor: f64,
    pub noise_ema_factor: f64,
    pub signal_noise_weight: f64,
    pub physiological_ceiling: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 255.0,
            window_capacity: 200,
            filter_low_cutoff: 0.0,
            filter_high_cutoff: 15.0,
            filter_order: 1,
            integration_window: 15,
            peak_spacing: 50,
            peak_amplitude_floor: 0.40,
            refractory_period: 120,
            detection_window: 40,
            signal_ema_factor: 0.125,
            noise_ema_factor: 0.125,
            signal_noise_weight: 0.25,
            physiological_ceiling: 10.0,
        }
    }
}

impl DetectorConfig {
    pub fn nyquist(&self) -> f64 {
        0.5 * self.sample_rate
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.filter_order == 0 {
            return Err(ConfigError::FilterOrder);
        }
        let (low, high, nyquist) = (self.filter_low_cutoff, self.filter_high_cutoff, self.nyquist());
        if !(low >= 0.0 && low < high && high < nyquist) {
            return Err(ConfigError::Cutoffs { low, high, nyquist });
        }
        if self.window_capacity < 2 {
            return Err(ConfigError::WindowCapacity(self.window_capacity));
        }
        if self.integration_window == 0 {
            return Err(ConfigError::IntegrationWindow);
        }
        if self.peak_spacing == 0 {
            return Err(ConfigError::PeakSpacing);
        }
        if !(self.peak_amplitude_floor.is_finite() && self.peak_amplitude_floor >= 0.0) {
            return Err(ConfigError::AmplitudeFloor(self.peak_amplitude_floor));
        }
        if self.detection_window > self.window_capacity {
            return Err(ConfigError::DetectionWindow {
                window: self.detection_window,
                capacity: self.window_capacity,
            });
        }
        for (name, value) in [
            ("signal_ema_factor", self.signal_ema_factor),
            ("noise_ema_factor", self.noise_ema_factor),
            ("signal_noise_weight", self.signal_noise_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Factor { name, value });
            }
        }
        if !(self.physiological_ceiling > 0.0) {
            return Err(ConfigError::Ceiling(self.physiological_ceiling));
        }
        Ok(())
    }

    /// Reads a KDL file and overlays whatever it sets on the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("detector.kdl");
        Self::parse(name, &content)
    }

    pub fn parse(file_name: &str, content: &str) -> ConfigResult<Self> {
        let file: ConfigFile =
            knuffel::parse(file_name, content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();
        file.apply(&mut config);
        debug!("Decoded configuration from {}: {:?}", file_name, config);
        config.validate()?;
        Ok(config)
    }
}

#[derive(Decode, Debug, Default)]
struct ConfigFile {
    #[knuffel(child)]
    filter: Option<FilterNode>,
    #[knuffel(child)]
    window: Option<WindowNode>,
    #[knuffel(child)]
    integration: Option<IntegrationNode>,
    #[knuffel(child)]
    peaks: Option<PeaksNode>,
    #[knuffel(child)]
    threshold: Option<ThresholdNode>,
}

#[derive(Decode, Debug)]
struct FilterNode {
    #[knuffel(property(name = "sample-rate"))]
    sample_rate: Option<f64>,
    #[knuffel(property(name = "low-cutoff"))]
    low_cutoff: Option<f64>,
    #[knuffel(property(name = "high-cutoff"))]
    high_cutoff: Option<f64>,
    #[knuffel(property)]
    order: Option<usize>,
}

#[derive(Decode, Debug)]
struct WindowNode {
    #[knuffel(property)]
    capacity: Option<usize>,
    #[knuffel(property)]
    ceiling: Option<f64>,
}

#[derive(Decode, Debug)]
struct IntegrationNode {
    #[knuffel(property)]
    window: Option<usize>,
}

#[derive(Decode, Debug)]
struct PeaksNode {
    #[knuffel(property)]
    spacing: Option<usize>,
    #[knuffel(property(name = "amplitude-floor"))]
    amplitude_floor: Option<f64>,
    #[knuffel(property(name = "detection-window"))]
    detection_window: Option<usize>,
}

#[derive(Decode, Debug)]
struct ThresholdNode {
    #[knuffel(property(name = "refractory-period"))]
    refractory_period: Option<usize>,
    #[knuffel(property(name = "signal-factor"))]
    signal_factor: Option<f64>,
    #[knuffel(property(name = "noise-factor"))]
    noise_factor: Option<f64>,
    #[knuffel(property(name = "signal-noise-weight"))]
    signal_noise_weight: Option<f64>,
}

fn overlay<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl ConfigFile {
    fn apply(&self, config: &mut DetectorConfig) {
        if let Some(f) = &self.filter {
            overlay(&mut config.sample_rate, f.sample_rate);
            overlay(&mut config.filter_low_cutoff, f.low_cutoff);
            overlay(&mut config.filter_high_cutoff, f.high_cutoff);
            overlay(&mut config.filter_order, f.order);
        }
        if let Some(w) = &self.window {
            overlay(&mut config.window_capacity, w.capacity);
            overlay(&mut config.physiological_ceiling, w.ceiling);
        }
        if let Some(i) = &self.integration {
            overlay(&mut config.integration_window, i.window);
        }
        if let Some(p) = &self.peaks {
            overlay(&mut config.peak_spacing, p.spacing);
            overlay(&mut config.peak_amplitude_floor, p.amplitude_floor);
            overlay(&mut config.detection_window, p.detection_window);
        }
        if let Some(t) = &self.threshold {
            overlay(&mut config.refractory_period, t.refractory_period);
            overlay(&mut config.signal_ema_factor, t.signal_factor);
            overlay(&mut config.noise_ema_factor, t.noise_factor);
            overlay(&mut config.signal_noise_weight, t.signal_noise_weight);
        }
    }
}
