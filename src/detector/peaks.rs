use serde::{Deserialize, Serialize};

// Offset applied to the virtual edge padding so a boundary sample can still win.
const EDGE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakCandidate {
    pub index: usize,
    pub value: f64,
}

/// Local maxima that beat every neighbour within `spacing` on both sides,
/// strictly, and exceed `limit`. Ascending index order.
///
/// Beyond either end the signal is treated as its boundary value minus a small
/// epsilon, so a monotonic ramp peaks at its last sample.
pub fn find_peaks(signal: &[f64], spacing: usize, limit: f64, out: &mut Vec<PeakCandidate>) {
    out.clear();
    let len = signal.len();
    if len == 0 {
        return;
    }
    let before_pad = signal[0] - EDGE_EPSILON;
    let after_pad = signal[len - 1] - EDGE_EPSILON;

    for (index, &value) in signal.iter().enumerate() {
        if value <= limit {
            continue;
        }
        let is_peak = (1..=spacing).all(|d| {
            let before = if d <= index { signal[index - d] } else { before_pad };
            let after = if index + d < len { signal[index + d] } else { after_pad };
            value > before && value > after
        });
        if is_peak {
            out.push(PeakCandidate { index, value });
        }
    }
}

/// Keeps candidates with `index > capacity - detection_window`, the newest
/// positions of a full window of `capacity` samples.
pub fn retain_recent(candidates: &mut Vec<PeakCandidate>, capacity: usize, detection_window: usize) {
    let oldest_fresh = capacity.saturating_sub(detection_window);
    candidates.retain(|c| c.index > oldest_fresh);
}
