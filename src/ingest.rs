use crate::detector::window::Sample;

const FIELD_SEPARATOR: char = ';';

/// Parses a `timestamp;value` line as sent by the acquisition board.
///
/// Anything else (wrong field count, non-numeric fields) is `None`; the
/// physiological range check is left to the detector.
pub fn parse_line(line: &str) -> Option<Sample> {
    let mut fields = line.trim_end().split(FIELD_SEPARATOR);
    let timestamp = fields.next()?.trim().parse::<f64>().ok()?;
    let value = fields.next()?.trim().parse::<f64>().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Sample::new(timestamp, value))
}

/// Counters kept by the line reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub lines: u64,
    pub malformed: u64,
}

impl IngestStats {
    pub fn record(&mut self, line: &str) -> Option<Sample> {
        self.lines += 1;
        let sample = parse_line(line);
        if sample.is_none() {
            self.malformed += 1;
        }
        sample
    }
}
