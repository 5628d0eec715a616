use std::str::FromStr;

pub fn positive_parser(s: &str) -> Result<f64, String> {
    let s = s.trim();
    f64::from_str(s)
        .map_err(|e| format!("Invalid number '{}': {}", s, e))
        .and_then(|v| {
            if v.is_finite() && v > 0.0 {
                Ok(v)
            } else {
                Err(format!("Value must be positive, got {}", v))
            }
        })
}

pub fn bpm_parser(s: &str) -> Result<f64, String> {
    let bpm = positive_parser(s)?;
    if !(20.0..=300.0).contains(&bpm) {
        return Err(format!("Heart rate must be between 20 and 300 bpm, got {}", bpm));
    }
    Ok(bpm)
}

pub fn amplitude_parser(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let v = f64::from_str(s).map_err(|e| format!("Invalid amplitude '{}': {}", s, e))?;
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(format!("Amplitude must be non-negative, got {}", v))
    }
}

pub fn queue_parser(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("Queue must hold at least one detection".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Invalid queue length '{}': {}", s, e)),
    }
}
