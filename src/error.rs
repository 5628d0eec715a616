use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reasons a detector configuration is refused at construction time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Sample rate must be positive and finite, got {0}")]
    SampleRate(f64),

    #[error("Filter order must be at least 1")]
    FilterOrder,

    /// Cutoffs must satisfy `0 <= low < high < nyquist`.
    #[error("Invalid band-pass cutoffs {low}..{high} Hz for nyquist frequency {nyquist} Hz")]
    Cutoffs { low: f64, high: f64, nyquist: f64 },

    #[error("Window capacity must hold at least 2 samples, got {0}")]
    WindowCapacity(usize),

    #[error("Integration window must be at least 1 sample")]
    IntegrationWindow,

    #[error("Peak spacing must be at least 1 sample")]
    PeakSpacing,

    #[error("Peak amplitude floor must be finite and non-negative, got {0}")]
    AmplitudeFloor(f64),

    #[error("Detection window of {window} samples exceeds window capacity {capacity}")]
    DetectionWindow { window: usize, capacity: usize },

    #[error("{name} must lie within [0, 1], got {value}")]
    Factor { name: &'static str, value: f64 },

    #[error("Physiological ceiling must be positive, got {0}")]
    Ceiling(f64),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}
