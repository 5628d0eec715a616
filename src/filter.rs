use biquad::{Biquad, Coefficients, DirectForm1};
use log::debug;
use num_complex::Complex64;

use crate::config::DetectorConfig;
use crate::error::{ConfigError, ConfigResult};

// Sample rate of the normalized digital design, so that 1.0 is nyquist.
const DESIGN_FS: f64 = 2.0;
const IMAG_EPS: f64 = 1e-12;

/// Butterworth band-pass realised as a cascade of second-order sections.
///
/// Each call to [`BandpassFilter::apply`] runs the cascade from a zero state,
/// equivalent to direct-form filtering of the whole buffer with the designed
/// transfer function.
pub struct BandpassFilter {
    sections: Vec<DirectForm1<f64>>,
    coefficients: Vec<Coefficients<f64>>,
}

impl BandpassFilter {
    pub fn new(config: &DetectorConfig) -> ConfigResult<Self> {
        let nyquist = config.nyquist();
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(ConfigError::SampleRate(config.sample_rate));
        }
        let (low, high) = (config.filter_low_cutoff, config.filter_high_cutoff);
        if !(low >= 0.0 && low < high && high < nyquist) {
            return Err(ConfigError::Cutoffs { low, high, nyquist });
        }
        let coefficients = butter_bandpass(config.filter_order, low / nyquist, high / nyquist)?;
        debug!(
            "Designed order {} band-pass {}..{} Hz as {} section(s)",
            config.filter_order,
            low,
            high,
            coefficients.len()
        );
        let sections = coefficients.iter().map(|c| DirectForm1::<f64>::new(*c)).collect();
        Ok(Self {
            sections,
            coefficients,
        })
    }

    pub fn coefficients(&self) -> &[Coefficients<f64>] {
        &self.coefficients
    }

    /// Filters `signal` in place.
    pub fn apply(&mut self, signal: &mut [f64]) {
        for section in self.sections.iter_mut() {
            section.reset_state();
            signal.iter_mut().for_each(|x| *x = section.run(*x));
        }
        self.sections.iter_mut().for_each(|s| s.reset_state());
    }
}

/// Digital Butterworth band-pass for cutoffs normalised to nyquist.
///
/// Analog prototype, low-pass to band-pass transform, then bilinear transform,
/// all in pole/zero form. A lower edge of exactly 0 is allowed: the band-pass
/// transform then degenerates into a low-pass response with an extra
/// pole/zero pair at DC.
pub fn butter_bandpass(order: usize, low: f64, high: f64) -> ConfigResult<Vec<Coefficients<f64>>> {
    if order == 0 {
        return Err(ConfigError::FilterOrder);
    }
    let warp = |w: f64| 2.0 * DESIGN_FS * (std::f64::consts::PI * w / DESIGN_FS).tan();
    let (wl, wh) = (warp(low), warp(high));
    let bw = wh - wl;
    let wo2 = wl * wh;

    let n = order as f64;
    let prototype: Vec<Complex64> = (0..order)
        .map(|k| {
            let theta = std::f64::consts::PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
            Complex64::from_polar(1.0, theta)
        })
        .collect();

    let mut analog_poles = Vec::with_capacity(2 * order);
    for &p in &prototype {
        let p_lp = p * (bw / 2.0);
        let root = (p_lp * p_lp - wo2).sqrt();
        analog_poles.push(p_lp + root);
    }
    for &p in &prototype {
        let p_lp = p * (bw / 2.0);
        let root = (p_lp * p_lp - wo2).sqrt();
        analog_poles.push(p_lp - root);
    }
    // `order` analog zeros at the origin, gain bw^order.
    let analog_gain = bw.powi(order as i32);

    let fs2 = Complex64::new(2.0 * DESIGN_FS, 0.0);
    let digital_poles: Vec<Complex64> = analog_poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    let num: Complex64 = std::iter::repeat(fs2).take(order).product();
    let den: Complex64 = analog_poles.iter().map(|&p| fs2 - p).product();
    let gain = analog_gain * (num / den).re;

    // Every section carries one zero at z = 1 and one at z = -1.
    let mut sections = Vec::with_capacity(order);
    let mut reals = Vec::new();
    for p in &digital_poles {
        if p.im > IMAG_EPS {
            sections.push(section(-2.0 * p.re, p.norm_sqr()));
        } else if p.im.abs() <= IMAG_EPS {
            reals.push(p.re);
        }
    }
    reals.sort_by(|a, b| a.total_cmp(b));
    for pair in reals.chunks(2) {
        match pair {
            [a, b] => sections.push(section(-(a + b), a * b)),
            [a] => sections.push(section(-a, 0.0)),
            _ => {}
        }
    }
    if let Some(first) = sections.first_mut() {
        first.b0 *= gain;
        first.b1 *= gain;
        first.b2 *= gain;
    }
    Ok(sections)
}

fn section(a1: f64, a2: f64) -> Coefficients<f64> {
    Coefficients {
        a1,
        a2,
        b0: 1.0,
        b1: 0.0,
        b2: -1.0,
    }
}
