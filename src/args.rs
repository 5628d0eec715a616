use std::path::PathBuf;

use crate::util::{amplitude_parser, bpm_parser, positive_parser, queue_parser};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time QRS complex detection for single-channel ECG streams.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect heartbeats in a stream of `timestamp;value` lines.
    Run(RunArgs),
    /// Print a synthetic ECG-like stream of `timestamp;value` lines.
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// File or device to read, `-` for stdin.
    #[arg(default_value = "-")]
    pub input: String,
    /// KDL configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_parser = positive_parser)]
    pub sample_rate: Option<f64>,
    /// Write detections as CSV instead of printing `Pulse`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Detections buffered for the output before new ones are dropped.
    #[arg(long, default_value_t = 64, value_parser = queue_parser)]
    pub queue: usize,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 10.0, value_parser = positive_parser)]
    pub seconds: f64,
    #[arg(long, default_value_t = 72.0, value_parser = bpm_parser)]
    pub bpm: f64,
    #[arg(long, default_value_t = 3.0, value_parser = amplitude_parser)]
    pub amplitude: f64,
    #[arg(long, default_value_t = 0.05, value_parser = amplitude_parser)]
    pub noise: f64,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    #[arg(long, default_value_t = 255.0, value_parser = positive_parser)]
    pub sample_rate: f64,
}
