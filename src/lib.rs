pub mod args;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod synth;
pub mod util;

pub use config::DetectorConfig;
pub use detector::threshold::DetectorState;
pub use detector::window::Sample;
pub use detector::{Detection, Ingested, QrsDetector};
pub use error::ConfigError;
