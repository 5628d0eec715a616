//! Sample-by-sample QRS detection.
//!
//! Every accepted sample triggers one full pass over the current window:
//! band-pass filter, first difference, square, moving-window integration,
//! spacing-constrained peak search over the newest positions, then the
//! adaptive signal/noise threshold with refractory gating.

pub mod peaks;
pub mod threshold;
pub mod transform;
pub mod window;

use log::trace;
use serde::Serialize;

use crate::config::DetectorConfig;
use crate::error::ConfigResult;
use crate::filter::BandpassFilter;
use peaks::{find_peaks, retain_recent, PeakCandidate};
use threshold::{Classification, DetectorState, ThresholdEngine};
use window::{Sample, SampleWindow};

/// A heartbeat reported by [`QrsDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// 1-based count of accepted samples when the beat was reported.
    pub sample_number: u64,
    /// Timestamp of the sample whose pass produced the detection.
    pub timestamp: f64,
    /// Position of the peak in the integrated signal of that pass.
    pub peak_index: usize,
    pub peak_value: f64,
    /// Threshold after the signal level was updated with this peak.
    pub threshold: f64,
}

/// Outcome of offering one sample to [`QrsDetector::offer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ingested {
    /// Outside the physiological ceiling; nothing changed.
    Rejected,
    /// Appended to the window and run through one pass.
    Accepted(Option<Detection>),
}

impl Ingested {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Ingested::Accepted(_))
    }

    pub fn detection(&self) -> Option<Detection> {
        match self {
            Ingested::Accepted(detection) => *detection,
            Ingested::Rejected => None,
        }
    }
}

pub struct QrsDetector {
    config: DetectorConfig,
    window: SampleWindow,
    filter: BandpassFilter,
    threshold: ThresholdEngine,
    // Scratch buffers reused by every pass.
    work: Vec<f64>,
    integrated: Vec<f64>,
    candidates: Vec<PeakCandidate>,
    accepted: u64,
    rejected: u64,
}

impl QrsDetector {
    pub fn new(config: DetectorConfig) -> ConfigResult<Self> {
        config.validate()?;
        let filter = BandpassFilter::new(&config)?;
        let capacity = config.window_capacity;
        Ok(Self {
            window: SampleWindow::new(capacity),
            filter,
            threshold: ThresholdEngine::new(&config),
            work: Vec::with_capacity(capacity),
            integrated: Vec::with_capacity(capacity + config.integration_window),
            candidates: Vec::new(),
            accepted: 0,
            rejected: 0,
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &DetectorState {
        self.threshold.state()
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Integrated signal computed by the most recent pass.
    pub fn integrated(&self) -> &[f64] {
        &self.integrated
    }

    /// Clears the window, the threshold levels and the counters. The filter design is kept.
    pub fn reset(&mut self) {
        self.window.clear();
        self.threshold.reset();
        self.work.clear();
        self.integrated.clear();
        self.candidates.clear();
        self.accepted = 0;
        self.rejected = 0;
    }

    /// Whether `sample` passes the physiological ceiling guard.
    pub fn accepts(&self, sample: &Sample) -> bool {
        sample.value.is_finite() && sample.value.abs() <= self.config.physiological_ceiling
    }

    /// Feeds one sample through the pipeline, reporting whether it was accepted.
    ///
    /// Out-of-range samples are dropped without touching the window or the
    /// threshold state; only the rejection counter moves.
    pub fn offer(&mut self, sample: Sample) -> Ingested {
        if !self.accepts(&sample) {
            self.rejected += 1;
            trace!("Rejected sample {:?}", sample);
            return Ingested::Rejected;
        }
        self.window.push(sample.value);
        self.accepted += 1;

        self.extract_peaks();
        let detection = match self.threshold.update(&self.candidates) {
            Classification::Signal(peak) => Some(Detection {
                sample_number: self.accepted,
                timestamp: sample.timestamp,
                peak_index: peak.index,
                peak_value: peak.value,
                threshold: self.threshold.state().threshold_value,
            }),
            _ => None,
        };
        Ingested::Accepted(detection)
    }

    /// [`QrsDetector::offer`] reduced to the detection, if any.
    pub fn ingest(&mut self, sample: Sample) -> Option<Detection> {
        self.offer(sample).detection()
    }

    /// Like [`QrsDetector::ingest`], handing any detection to `on_detection`
    /// before returning. The callback runs on the ingesting thread and must
    /// not block.
    pub fn ingest_with<F>(&mut self, sample: Sample, mut on_detection: F) -> Option<Detection>
    where
        F: FnMut(&Detection),
    {
        let detection = self.ingest(sample);
        if let Some(d) = &detection {
            on_detection(d);
        }
        detection
    }

    fn extract_peaks(&mut self) {
        self.window.copy_into(&mut self.work);
        self.filter.apply(&mut self.work);
        transform::differentiate(&mut self.work);
        transform::square(&mut self.work);
        transform::integrate(&self.work, self.config.integration_window, &mut self.integrated);

        find_peaks(
            &self.integrated,
            self.config.peak_spacing,
            self.config.peak_amplitude_floor,
            &mut self.candidates,
        );
        // Freshness is measured against the full window, so nothing counts
        // until the integrated signal reaches past `capacity - detection_window`.
        retain_recent(&mut self.candidates, self.window.capacity(), self.config.detection_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::PulseTrain;

    fn detector() -> QrsDetector {
        QrsDetector::new(DetectorConfig::default()).unwrap()
    }

    fn run(detector: &mut QrsDetector, samples: impl IntoIterator<Item = Sample>) -> Vec<Detection> {
        samples.into_iter().filter_map(|s| detector.ingest(s)).collect()
    }

    fn train(period: usize, offset: usize) -> PulseTrain {
        PulseTrain {
            sample_rate: 255.0,
            period,
            offset,
            amplitude: 3.0,
            width: 3.0,
            noise: 0.0,
            seed: 7,
        }
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let config = DetectorConfig {
            filter_low_cutoff: 15.0,
            filter_high_cutoff: 5.0,
            ..Default::default()
        };
        assert!(QrsDetector::new(config).is_err());
    }

    #[test]
    fn test_ceiling_boundary() {
        let mut detector = detector();
        detector.ingest(Sample::new(0.0, 0.5));
        let before = *detector.state();

        assert_eq!(detector.offer(Sample::new(0.1, 10.0001)), Ingested::Rejected);
        assert_eq!(detector.offer(Sample::new(0.2, -10.5)), Ingested::Rejected);
        assert_eq!(detector.ingest(Sample::new(0.3, f64::NAN)), None);
        assert_eq!(detector.window().len(), 1);
        assert_eq!(*detector.state(), before);
        assert_eq!(detector.accepted(), 1);
        assert_eq!(detector.rejected(), 3);

        let outcome = detector.offer(Sample::new(0.4, 10.0));
        assert!(outcome.is_accepted());
        assert_eq!(outcome.detection(), None);
        assert_eq!(detector.window().len(), 2);
        assert_eq!(detector.state().samples_since_last_detection, 2);
    }

    #[test]
    fn test_window_stays_bounded() {
        let mut detector = detector();
        for i in 0..500 {
            detector.ingest(Sample::new(i as f64, (i % 13) as f64 * 0.1));
            assert!(detector.window().len() <= 200);
        }
        assert_eq!(detector.window().len(), 200);
        let expected: Vec<f64> = (300..500).map(|i| (i % 13) as f64 * 0.1).collect();
        assert_eq!(detector.window().iter().collect::<Vec<_>>(), expected);
        // Integrated length: (capacity - 1) + integration_window - 1.
        assert_eq!(detector.integrated().len(), 213);
    }

    #[test]
    fn test_single_pulse_warm_up() {
        let mut detector = detector();
        let detections = run(&mut detector, train(10_000, 300).samples(700));
        assert_eq!(detections.len(), 1, "{:?}", detections);
        let d = detections[0];
        assert!(d.peak_value > 0.4);
        assert!((290..=320).contains(&d.sample_number), "detected at {}", d.sample_number);
        assert!(d.peak_index > 160, "peak index {}", d.peak_index);
        assert_eq!(detector.state().noise_peak_value, 0.0);
        assert!(detector.state().signal_peak_value > 0.0);
    }

    #[test]
    fn test_pulse_before_window_fills_is_not_reported() {
        // Its integrated index never passes capacity - detection_window.
        for offset in [130, 150] {
            let mut detector = detector();
            let detections = run(&mut detector, train(10_000, offset).samples(600));
            assert!(detections.is_empty(), "pulse at {}: {:?}", offset, detections);
            assert_eq!(*detector.state(), DetectorState {
                samples_since_last_detection: 600,
                ..Default::default()
            });
        }
    }

    #[test]
    fn test_periodic_pulse_train() {
        let mut detector = detector();
        let pulses = train(200, 250);
        let detections = run(&mut detector, pulses.samples(2000));
        assert_eq!(detections.len(), 9, "{:?}", detections);
        for (k, d) in detections.iter().enumerate() {
            let centre = 250 + 200 * k as u64;
            assert!(
                d.sample_number + 10 >= centre && d.sample_number <= centre + 20,
                "beat {} reported at {}",
                k,
                d.sample_number
            );
        }
    }

    #[test]
    fn test_first_beat_waits_for_full_window() {
        let detections = run(&mut detector(), train(200, 150).samples(1000));
        let reported: Vec<u64> = detections.iter().map(|d| d.sample_number).collect();
        assert_eq!(reported.len(), 4, "{:?}", reported);
        assert!(reported[0] >= 340 && reported[0] <= 370, "{:?}", reported);
    }

    #[test]
    fn test_noisy_pulse_train() {
        let mut detector = detector();
        let pulses = PulseTrain {
            noise: 0.1,
            ..train(170, 150)
        };
        // The beat at 150 falls before the window fills.
        let detections = run(&mut detector, pulses.samples(2000));
        assert_eq!(detections.len(), 10, "{:?}", detections);
    }

    #[test]
    fn test_refractory_spacing() {
        // Beats every 90 samples are closer than the refractory period.
        let mut detector = detector();
        let detections = run(&mut detector, train(90, 130).samples(3000));
        assert!(!detections.is_empty());
        for pair in detections.windows(2) {
            let gap = pair[1].sample_number - pair[0].sample_number;
            assert!(gap > 120, "detections only {} samples apart", gap);
        }
    }

    #[test]
    fn test_deterministic() {
        let pulses = PulseTrain {
            noise: 0.15,
            seed: 99,
            ..train(180, 140)
        };
        let first = run(&mut detector(), pulses.samples(1500));
        let second = run(&mut detector(), pulses.samples(1500));
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_low_noise_yields_nothing() {
        let mut detector = detector();
        let noise = PulseTrain {
            amplitude: 0.0,
            noise: 0.25,
            seed: 3,
            ..train(10_000, 10_000)
        };
        let detections = run(&mut detector, noise.samples(1500));
        assert!(detections.is_empty(), "{:?}", detections);
        assert!(detector.integrated().iter().all(|&v| v < 0.4));
        assert_eq!(detector.state().signal_peak_value, 0.0);
        assert_eq!(detector.state().threshold_value, 0.0);
    }

    #[test]
    fn test_reset_matches_fresh_detector() {
        let pulses = train(200, 150);
        let mut reused = detector();
        run(&mut reused, pulses.samples(700));
        reused.reset();
        assert_eq!(*reused.state(), DetectorState::default());
        assert!(reused.window().is_empty());

        let after_reset = run(&mut reused, pulses.samples(1000));
        let fresh = run(&mut detector(), pulses.samples(1000));
        assert_eq!(after_reset, fresh);
    }

    #[test]
    fn test_ingest_with_invokes_callback() {
        let mut detector = detector();
        let mut seen = Vec::new();
        for sample in train(200, 150).samples(800) {
            detector.ingest_with(sample, |d| seen.push(d.sample_number));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_detection_writes_csv_record() {
        let detection = Detection {
            sample_number: 312,
            timestamp: 1.25,
            peak_index: 198,
            peak_value: 2.5,
            threshold: 0.625,
        };
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(detection).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("sample_number,timestamp,peak_index,peak_value,threshold"));
        assert_eq!(lines.next(), Some("312,1.25,198,2.5,0.625"));
    }
}
