use crate::{
    config::AnalysisConfig,
    metrics::MetricValue,
    signal::{Events, RRSeries},
};
use serde::{Deserialize, Serialize};

/// R-peaks found in a filtered lead together with the rate derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatDetection {
    pub peaks: Events,
    pub rr: RRSeries,
    pub heart_rate_bpm: MetricValue,
}

impl BeatDetection {
    pub fn from_events(events: Events, sampling_rate: u32) -> Self {
        let rr = RRSeries::from_events(&events, sampling_rate);
        let heart_rate_bpm = MetricValue::from(rr.heart_rate());
        Self {
            peaks: events,
            rr,
            heart_rate_bpm,
        }
    }
}

/// Detect beats with the height/distance settings from `cfg`.
///
/// A signal without any qualifying peak is a valid outcome: the peak set is
/// empty and the heart rate is unavailable.
pub fn detect_beats(filtered: &[f64], sampling_rate: u32, cfg: &AnalysisConfig) -> BeatDetection {
    let events = detect_r_peaks(
        filtered,
        sampling_rate,
        cfg.min_peak_height,
        cfg.min_peak_distance_s,
    );
    let detection = BeatDetection::from_events(events, sampling_rate);
    log::debug!(
        "detected {} R-peak(s), heart rate {}",
        detection.peaks.len(),
        detection.heart_rate_bpm
    );
    detection
}

/// Greedy height + refractory-distance peak picker.
///
/// Local maxima at or above `min_height` are visited in sample order. The
/// first one is kept and any later candidate closer than `min_distance_s` to
/// the last kept peak is dropped.
pub fn detect_r_peaks(
    filtered: &[f64],
    sampling_rate: u32,
    min_height: f64,
    min_distance_s: f64,
) -> Events {
    let min_gap = min_distance_samples(sampling_rate, min_distance_s);
    let mut peaks: Vec<usize> = Vec::new();
    for idx in local_maxima(filtered) {
        if filtered[idx] < min_height {
            continue;
        }
        match peaks.last() {
            Some(&last) if idx - last < min_gap => continue,
            _ => peaks.push(idx),
        }
    }
    Events::from_indices(peaks)
}

fn min_distance_samples(sampling_rate: u32, min_distance_s: f64) -> usize {
    let samples = (min_distance_s.max(0.0) * sampling_rate as f64).round();
    (samples as usize).max(1)
}

/// Indices where the signal rises into a sample and then falls, possibly
/// after a flat run. A plateau reports its middle sample (the left one of
/// the two central samples when its length is even); a plateau that rises
/// again or runs into the end of the signal is not a maximum.
fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if data.len() < 3 {
        return maxima;
    }
    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}
