pub mod hrv;
pub mod intervals;

use crate::signal::{Events, RRSeries};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric that is either measured or explicitly unavailable.
///
/// Serialized as `{"status": "available", "value": 72.0}` or
/// `{"status": "unavailable"}` so consumers never confuse a missing value with 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Available(f64),
    #[default]
    Unavailable,
}

impl MetricValue {
    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Available(v) => Some(v),
            MetricValue::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, MetricValue::Available(_))
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            MetricValue::Available(v) => MetricValue::Available(f(v)),
            MetricValue::Unavailable => MetricValue::Unavailable,
        }
    }
}

impl From<Option<f64>> for MetricValue {
    /// Non-finite values are treated as unavailable.
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => MetricValue::Available(v),
            _ => MetricValue::Unavailable,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Available(v) => write!(f, "{v:.2}"),
            MetricValue::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Everything the interpretation rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub heart_rate_bpm: MetricValue,
    pub rmssd_ms: MetricValue,
    pub sdnn_ms: MetricValue,
    pub pnn50: MetricValue,
    pub lf_hf: MetricValue,
    pub pr_ms: MetricValue,
    pub qrs_ms: MetricValue,
    pub qt_ms: MetricValue,
    /// Population RR standard deviation in seconds, the quantity the
    /// variability rule compares. `sdnn_ms` uses the sample estimator instead.
    pub rr_std_s: MetricValue,
    /// Number of R-peaks the metrics were derived from.
    pub beat_count: usize,
    /// Beats whose P onset, QRS and T offset were all located.
    pub delineated_beats: usize,
}

impl Metrics {
    /// Named values in a stable order, with their units.
    pub fn entries(&self) -> [(&'static str, &'static str, MetricValue); 8] {
        [
            ("heart_rate", "bpm", self.heart_rate_bpm),
            ("rmssd", "ms", self.rmssd_ms),
            ("sdnn", "ms", self.sdnn_ms),
            ("pnn50", "fraction", self.pnn50),
            ("lf_hf", "ratio", self.lf_hf),
            ("pr_interval", "ms", self.pr_ms),
            ("qrs_duration", "ms", self.qrs_ms),
            ("qt_interval", "ms", self.qt_ms),
        ]
    }
}

/// Derive rate, HRV and interval metrics from a filtered lead and its R-peaks.
pub fn extract_metrics(filtered: &[f64], peaks: &Events, sampling_rate: u32) -> Metrics {
    let rr = RRSeries::from_events(peaks, sampling_rate);
    let time = hrv::hrv_time(&rr);
    let lf_hf = hrv::lf_hf_ratio(&rr);
    let rr_std_s = if rr.len() >= hrv::MIN_RR_FOR_HRV {
        MetricValue::from(rr.std_dev())
    } else {
        MetricValue::Unavailable
    };
    let fiducials = intervals::delineate(filtered, peaks, sampling_rate);
    let summary = intervals::summarize(&fiducials, sampling_rate);
    log::debug!(
        "delineated {}/{} beat(s): PR {} QRS {} QT {}",
        summary.delineated_beats,
        peaks.len(),
        summary.pr_ms,
        summary.qrs_ms,
        summary.qt_ms
    );
    Metrics {
        heart_rate_bpm: MetricValue::from(rr.heart_rate()),
        rmssd_ms: time.rmssd_ms,
        sdnn_ms: time.sdnn_ms,
        pnn50: time.pnn50,
        lf_hf,
        pr_ms: summary.pr_ms,
        qrs_ms: summary.qrs_ms,
        qt_ms: summary.qt_ms,
        rr_std_s,
        beat_count: peaks.len(),
        delineated_beats: summary.delineated_beats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_value_serializes_tagged() {
        let js = serde_json::to_string(&MetricValue::Available(72.5)).unwrap();
        assert_eq!(js, r#"{"status":"available","value":72.5}"#);
        let js = serde_json::to_string(&MetricValue::Unavailable).unwrap();
        assert_eq!(js, r#"{"status":"unavailable"}"#);
        let back: MetricValue = serde_json::from_str(r#"{"status":"unavailable"}"#).unwrap();
        assert_eq!(back, MetricValue::Unavailable);
    }

    #[test]
    fn non_finite_becomes_unavailable() {
        assert_eq!(MetricValue::from(Some(f64::NAN)), MetricValue::Unavailable);
        assert_eq!(MetricValue::from(None), MetricValue::Unavailable);
        assert_eq!(MetricValue::from(Some(0.0)), MetricValue::Available(0.0));
    }

    #[test]
    fn no_peaks_means_nothing_available() {
        let m = extract_metrics(&[0.0; 1000], &Events::default(), 250);
        for (name, _, value) in m.entries() {
            assert_eq!(value, MetricValue::Unavailable, "{name}");
        }
        assert_eq!(m.beat_count, 0);
        assert_eq!(m.rr_std_s, MetricValue::Unavailable);
    }

    #[test]
    fn rr_std_is_population_while_sdnn_is_sample() {
        // RR = [0.6, 0.9] s
        let peaks = Events::from_indices(vec![100, 700, 1600]);
        let m = extract_metrics(&[0.0; 2000], &peaks, 1000);
        assert!((m.rr_std_s.value().unwrap() - 0.15).abs() < 1e-12);
        let sdnn = m.sdnn_ms.value().unwrap();
        assert!((sdnn - 150.0 * 2f64.sqrt()).abs() < 1e-9, "sdnn {sdnn}");
    }

    #[test]
    fn single_interval_has_no_rr_std() {
        let m = extract_metrics(&[0.0; 1000], &Events::from_indices(vec![100, 700]), 1000);
        assert_eq!(m.rr_std_s, MetricValue::Unavailable);
    }
}
