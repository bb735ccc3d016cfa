use serde::{Deserialize, Serialize};

/// Uniformly sampled single-lead recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Sampling rate in Hz
    pub fs: u32,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: u32, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        if self.fs == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.fs as f64
    }
}

/// Detected R-peaks as strictly increasing sample indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_events(events: &Events, fs: u32) -> Self {
        let fs = fs.max(1) as f64;
        let rr = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.rr.is_empty() {
            return None;
        }
        Some(self.rr.iter().sum::<f64>() / self.rr.len() as f64)
    }

    /// Population standard deviation of the intervals, in seconds.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let var = self.rr.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / self.rr.len() as f64;
        Some(var.sqrt())
    }

    /// Mean heart rate in bpm, `None` when there is no positive interval to average.
    pub fn heart_rate(&self) -> Option<f64> {
        self.mean()
            .and_then(|mean| if mean > 0.0 { Some(60.0 / mean) } else { None })
    }
}
