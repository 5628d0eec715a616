use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use log::{info, trace, warn};
use qrs_detect::args::{Cli, Commands, RunArgs, SimulateArgs};
use qrs_detect::ingest::IngestStats;
use qrs_detect::synth::PulseTrain;
use qrs_detect::{Detection, DetectorConfig, QrsDetector};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver};

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        log::error!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => detect(args).await,
        Commands::Simulate(args) => simulate(&args),
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "qrs-detect", "qrs-detect")
        .map(|dirs| dirs.config_dir().join("detector.kdl"))
}

fn load_config(args: &RunArgs) -> Result<DetectorConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => default_config_path().filter(|p| p.exists()),
    };
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            DetectorConfig::load(&path)
                .with_context(|| format!("Failed to load configuration: {}", path.display()))?
        }
        None => DetectorConfig::default(),
    };
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    Ok(config)
}

async fn detect(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let mut detector = QrsDetector::new(config).context("Invalid detector configuration")?;
    info!("Detector configuration: {:?}", detector.config());

    let reader: Box<dyn AsyncRead + Unpin + Send> = if args.input == "-" {
        info!("Reading samples from stdin");
        Box::new(tokio::io::stdin())
    } else {
        info!("Reading samples from {}", args.input);
        let file = tokio::fs::File::open(&args.input)
            .await
            .with_context(|| format!("Failed to open input: {}", args.input))?;
        Box::new(file)
    };
    let mut lines = BufReader::new(reader).lines();

    let (tx, rx) = mpsc::channel::<Detection>(args.queue);
    let output = args.output.clone();
    let consumer = tokio::task::spawn_blocking(move || consume(rx, output));

    let mut stats = IngestStats::default();
    let mut detections = 0u64;
    let mut dropped = 0u64;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let Some(sample) = stats.record(&line) else {
            trace!("Skipping malformed line {:?}", line);
            continue;
        };
        let Some(detection) = detector.ingest(sample) else {
            continue;
        };
        detections += 1;
        match tx.try_send(detection) {
            Ok(()) => {}
            Err(TrySendError::Full(d)) => {
                dropped += 1;
                warn!("Detection queue full, dropping beat at sample {}", d.sample_number);
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }
    drop(tx);
    consumer.await.context("Detection consumer panicked")??;

    info!(
        "Processed {} lines ({} malformed): {} samples accepted, {} rejected, {} detections ({} dropped)",
        stats.lines,
        stats.malformed,
        detector.accepted(),
        detector.rejected(),
        detections,
        dropped
    );
    Ok(())
}

fn consume(mut rx: Receiver<Detection>, output: Option<PathBuf>) -> Result<()> {
    let mut writer = match &output {
        Some(path) => Some(
            csv::Writer::from_path(path)
                .with_context(|| format!("Failed to create output: {}", path.display()))?,
        ),
        None => None,
    };
    let stdout = std::io::stdout();
    while let Some(detection) = rx.blocking_recv() {
        match writer.as_mut() {
            Some(w) => {
                w.serialize(detection)?;
                w.flush()?;
            }
            None => {
                let mut out = stdout.lock();
                writeln!(out, "Pulse")?;
                out.flush()?;
            }
        }
    }
    Ok(())
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    let train = PulseTrain {
        amplitude: args.amplitude,
        noise: args.noise,
        seed: args.seed,
        ..PulseTrain::from_bpm(args.sample_rate, args.bpm)
    };
    let count = (args.seconds * args.sample_rate).round() as usize;
    info!(
        "Simulating {} samples at {} Hz, {} bpm (period {} samples)",
        count, args.sample_rate, args.bpm, train.period
    );

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for sample in train.samples(count) {
        writeln!(out, "{:.4};{:.6}", sample.timestamp, sample.value)?;
    }
    out.flush()?;
    Ok(())
}
