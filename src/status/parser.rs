use serde_json::Value;

/// Buffered-ahead units reported by the streamer. Not a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub raw_value: f64,
}

impl ProgressReport {
    pub const COMPLETE: u8 = 100;
    const SCALE: f64 = 20.0;

    pub fn new(raw_value: f64) -> Self {
        Self { raw_value }
    }

    /// `min(100, floor(raw * 20))`
    pub fn display_progress(&self) -> u8 {
        let scaled = (self.raw_value * Self::SCALE).floor();
        if scaled.is_nan() || scaled <= 0.0 {
            0
        } else if scaled >= Self::COMPLETE as f64 {
            Self::COMPLETE
        } else {
            scaled as u8
        }
    }
}

pub struct StatusParser;

impl StatusParser {
    /// Decodes a status artifact. Anything that isn't a JSON object with a
    /// numeric `progress` field yields `None`; other fields are ignored.
    pub fn parse(bytes: &[u8]) -> Option<ProgressReport> {
        if bytes.is_empty() {
            log::debug!("Status artifact is empty");
            return None;
        }

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring malformed status artifact: {}", e);
                return None;
            }
        };

        let Some(fields) = value.as_object() else {
            log::warn!("Ignoring status artifact that is not an object");
            return None;
        };

        match fields.get("progress").and_then(Value::as_f64) {
            Some(raw_value) => {
                log::debug!("Parsed status: progress={}", raw_value);
                Some(ProgressReport::new(raw_value))
            }
            None => {
                log::debug!("Status artifact has no numeric progress field");
                None
            }
        }
    }
}
