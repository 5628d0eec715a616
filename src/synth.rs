use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detector::window::Sample;

/// Gaussian bumps every `period` samples starting at `offset`, over a flat
/// baseline, plus optional uniform noise in `[-noise, noise]`.
#[derive(Debug, Clone)]
pub struct PulseTrain {
    pub sample_rate: f64,
    pub period: usize,
    pub offset: usize,
    pub amplitude: f64,
    /// Standard deviation of each bump, in samples.
    pub width: f64,
    pub noise: f64,
    pub seed: u64,
}

impl PulseTrain {
    pub fn from_bpm(sample_rate: f64, bpm: f64) -> Self {
        let period = (sample_rate * 60.0 / bpm).round().max(1.0) as usize;
        Self {
            sample_rate,
            period,
            offset: period / 2,
            amplitude: 3.0,
            width: sample_rate * 0.012,
            noise: 0.0,
            seed: 0,
        }
    }

    pub fn value_at(&self, index: usize) -> f64 {
        let period = self.period.max(1) as f64;
        let rel = index as f64 - self.offset as f64;
        let k = (rel / period).round().max(0.0);
        let centre = self.offset as f64 + k * period;
        let z = (index as f64 - centre) / self.width;
        self.amplitude * (-0.5 * z * z).exp()
    }

    /// The first `count` samples, timestamped in seconds. Restarts the noise
    /// sequence from `seed` on every call.
    pub fn samples(&self, count: usize) -> impl Iterator<Item = Sample> + '_ {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count).map(move |i| {
            let mut value = self.value_at(i);
            if self.noise > 0.0 {
                value += rng.gen_range(-self.noise..=self.noise);
            }
            Sample::new(i as f64 / self.sample_rate, value)
        })
    }
}
