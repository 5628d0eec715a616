//! Stateless stages between the band-pass filter and the peak finder.

/// First difference in place: `signal[i] = signal[i + 1] - signal[i]`, one shorter.
pub fn differentiate(signal: &mut Vec<f64>) {
    if signal.is_empty() {
        return;
    }
    for i in 0..signal.len() - 1 {
        signal[i] = signal[i + 1] - signal[i];
    }
    signal.pop();
}

pub fn square(signal: &mut [f64]) {
    signal.iter_mut().for_each(|x| *x *= *x);
}

/// Full convolution with a unit box kernel of `width` samples.
///
/// The output is `input.len() + width - 1` long and tapers at both ends.
/// An empty input yields an empty output.
pub fn integrate(input: &[f64], width: usize, out: &mut Vec<f64>) {
    out.clear();
    if input.is_empty() || width == 0 {
        return;
    }
    let len = input.len() + width - 1;
    out.reserve(len);
    // Direct sums keep flat stretches exactly flat.
    for k in 0..len {
        let start = (k + 1).saturating_sub(width);
        let end = (k + 1).min(input.len());
        out.push(input[start..end].iter().sum());
    }
}
