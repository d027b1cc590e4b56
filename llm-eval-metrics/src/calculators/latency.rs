use serde::{Deserialize, Serialize};

/// Min / max / mean over a set of latency measurements (ms).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatencySummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

impl LatencySummary {
    pub fn from_measurements(measurements: &[f64]) -> Self {
        if measurements.is_empty() {
            return Self::empty();
        }

        let min = measurements.iter().copied().fold(f64::INFINITY, f64::min);
        let max = measurements.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = measurements.iter().sum::<f64>() / measurements.len() as f64;

        Self {
            min,
            max,
            mean,
            count: measurements.len(),
        }
    }

    fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            count: 0,
        }
    }
}
