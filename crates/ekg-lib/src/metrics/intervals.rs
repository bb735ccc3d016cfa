//! Per-beat delineation of P, QRS and T boundaries around each R-peak.
//!
//! Boundaries are measured against a per-beat isoelectric level (the median
//! of the beat's cycle). QRS edges are the nearest quiet runs around the R-peak;
//! P onset and T offset are where the wave falls to a tenth of its own
//! amplitude. A boundary that cannot be located is left as `None` and the beat
//! drops out of that interval's mean.

use crate::{metrics::MetricValue, signal::Events};
use serde::{Deserialize, Serialize};

const QRS_SEARCH_BACK_S: f64 = 0.080;
const QRS_SEARCH_FORWARD_S: f64 = 0.100;
const QUIET_RUN_S: f64 = 0.008;
/// Fraction of R amplitude treated as isoelectric around the QRS.
const QRS_QUIET_FRACTION: f64 = 0.05;
const P_SEARCH_EARLIEST_S: f64 = 0.300;
const P_SEARCH_LATEST_S: f64 = 0.040;
const T_SEARCH_GAP_S: f64 = 0.040;
/// T search ends this far into the following RR interval.
const T_SEARCH_RR_FRACTION: f64 = 0.7;
/// P and T must reach this fraction of R amplitude to count as present.
const MIN_WAVE_FRACTION: f64 = 0.05;
const WAVE_EDGE_FRACTION: f64 = 0.1;
const SMOOTHING_S: f64 = 0.020;

/// Sample positions of the fiducial points of one beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatFiducials {
    pub r_peak: usize,
    pub p_onset: Option<usize>,
    pub qrs_onset: Option<usize>,
    pub qrs_offset: Option<usize>,
    pub t_offset: Option<usize>,
}

impl BeatFiducials {
    fn unresolved(r_peak: usize) -> Self {
        Self {
            r_peak,
            p_onset: None,
            qrs_onset: None,
            qrs_offset: None,
            t_offset: None,
        }
    }

    pub fn pr_samples(&self) -> Option<usize> {
        self.qrs_onset?.checked_sub(self.p_onset?)
    }

    pub fn qrs_samples(&self) -> Option<usize> {
        self.qrs_offset?.checked_sub(self.qrs_onset?)
    }

    pub fn qt_samples(&self) -> Option<usize> {
        self.t_offset?.checked_sub(self.qrs_onset?)
    }

    pub fn is_complete(&self) -> bool {
        self.p_onset.is_some()
            && self.qrs_onset.is_some()
            && self.qrs_offset.is_some()
            && self.t_offset.is_some()
    }
}

/// Mean PR, QRS and QT durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalSummary {
    pub pr_ms: MetricValue,
    pub qrs_ms: MetricValue,
    pub qt_ms: MetricValue,
    pub delineated_beats: usize,
}

pub fn summarize(fiducials: &[BeatFiducials], sampling_rate: u32) -> IntervalSummary {
    let to_ms = 1000.0 / sampling_rate.max(1) as f64;
    let mean_ms = |f: fn(&BeatFiducials) -> Option<usize>| {
        let values: Vec<f64> = fiducials
            .iter()
            .filter_map(f)
            .map(|s| s as f64 * to_ms)
            .collect();
        if values.is_empty() {
            MetricValue::Unavailable
        } else {
            MetricValue::Available(values.iter().sum::<f64>() / values.len() as f64)
        }
    };
    IntervalSummary {
        pr_ms: mean_ms(BeatFiducials::pr_samples),
        qrs_ms: mean_ms(BeatFiducials::qrs_samples),
        qt_ms: mean_ms(BeatFiducials::qt_samples),
        delineated_beats: fiducials.iter().filter(|f| f.is_complete()).count(),
    }
}

/// Locate P onset, QRS onset/offset and T offset for every R-peak.
pub fn delineate(signal: &[f64], peaks: &Events, sampling_rate: u32) -> Vec<BeatFiducials> {
    let n = signal.len();
    if n == 0 || peaks.is_empty() || sampling_rate == 0 {
        return Vec::new();
    }
    let fs = sampling_rate as f64;
    let samples = |seconds: f64| ((seconds * fs).round() as usize).max(1);
    let smoothed = centered_moving_average(signal, samples(SMOOTHING_S));
    let typical_rr = median_gap(&peaks.indices).unwrap_or(sampling_rate as usize);
    let quiet_run = samples(QUIET_RUN_S);

    let mut out = Vec::with_capacity(peaks.len());
    let mut prev_t_offset: Option<usize> = None;
    for (k, &r) in peaks.indices.iter().enumerate() {
        if r >= n {
            out.push(BeatFiducials::unresolved(r));
            prev_t_offset = None;
            continue;
        }
        let prev_gap = if k > 0 {
            r.saturating_sub(peaks.indices[k - 1])
        } else {
            typical_rr
        };
        let next_gap = peaks
            .indices
            .get(k + 1)
            .map(|&next| next.saturating_sub(r))
            .unwrap_or(typical_rr);

        let cycle_start = r.saturating_sub(prev_gap / 2);
        let cycle_end = (r + next_gap / 2).min(n - 1);
        let baseline = median(&signal[cycle_start..=cycle_end]);
        let r_amp = signal[r] - baseline;
        if r_amp <= 0.0 {
            out.push(BeatFiducials::unresolved(r));
            prev_t_offset = None;
            continue;
        }

        let quiet = QRS_QUIET_FRACTION * r_amp;
        let qrs_onset = quiet_edge_before(
            signal,
            baseline,
            quiet,
            r,
            samples(QRS_SEARCH_BACK_S),
            quiet_run,
        );
        let qrs_offset = quiet_edge_after(
            signal,
            baseline,
            quiet,
            r,
            samples(QRS_SEARCH_FORWARD_S),
            quiet_run,
        );

        let min_wave = MIN_WAVE_FRACTION * r_amp;
        let p_onset = qrs_onset.and_then(|onset| {
            let earliest = prev_t_offset.unwrap_or(cycle_start);
            let start = onset.saturating_sub(samples(P_SEARCH_EARLIEST_S)).max(earliest);
            let end = onset.checked_sub(samples(P_SEARCH_LATEST_S))?;
            p_wave_onset(&smoothed, baseline, start, end, min_wave)
        });

        let t_offset = qrs_offset.and_then(|offset| {
            let start = offset + samples(T_SEARCH_GAP_S);
            let end = (r + (T_SEARCH_RR_FRACTION * next_gap as f64) as usize).min(n - 1);
            t_wave_offset(&smoothed, baseline, start, end, min_wave)
        });

        prev_t_offset = t_offset;
        out.push(BeatFiducials {
            r_peak: r,
            p_onset,
            qrs_onset,
            qrs_offset,
            t_offset,
        });
    }
    out
}

/// Closest sample before `from` that opens a run of `run` quiet samples.
fn quiet_edge_before(
    data: &[f64],
    baseline: f64,
    threshold: f64,
    from: usize,
    max_back: usize,
    run: usize,
) -> Option<usize> {
    let stop = from.saturating_sub(max_back);
    let mut quiet = 0;
    let mut i = from;
    while i > stop {
        i -= 1;
        if (data[i] - baseline).abs() < threshold {
            quiet += 1;
            if quiet == run {
                return Some(i + run - 1);
            }
        } else {
            quiet = 0;
        }
    }
    None
}

/// Closest sample after `from` that opens a run of `run` quiet samples.
fn quiet_edge_after(
    data: &[f64],
    baseline: f64,
    threshold: f64,
    from: usize,
    max_forward: usize,
    run: usize,
) -> Option<usize> {
    let stop = (from + max_forward).min(data.len() - 1);
    let mut quiet = 0;
    for i in from + 1..=stop {
        if (data[i] - baseline).abs() < threshold {
            quiet += 1;
            if quiet == run {
                return Some(i + 1 - run);
            }
        } else {
            quiet = 0;
        }
    }
    None
}

fn p_wave_onset(
    smoothed: &[f64],
    baseline: f64,
    start: usize,
    end: usize,
    min_amp: f64,
) -> Option<usize> {
    if start >= end {
        return None;
    }
    let (peak, amp) = (start..=end)
        .map(|i| (i, smoothed[i] - baseline))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if amp < min_amp {
        return None;
    }
    let edge = WAVE_EDGE_FRACTION * amp;
    (start..peak).rev().find(|&i| smoothed[i] - baseline < edge)
}

fn t_wave_offset(
    smoothed: &[f64],
    baseline: f64,
    start: usize,
    end: usize,
    min_amp: f64,
) -> Option<usize> {
    if start >= end {
        return None;
    }
    let (peak, amp) = (start..=end)
        .map(|i| (i, (smoothed[i] - baseline).abs()))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if amp < min_amp {
        return None;
    }
    let edge = WAVE_EDGE_FRACTION * amp;
    (peak + 1..=end).find(|&i| (smoothed[i] - baseline).abs() < edge)
}

fn centered_moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if data.is_empty() || win <= 1 {
        return data.to_vec();
    }
    let half = win / 2;
    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in data {
        acc += x;
        prefix.push(acc);
    }
    (0..data.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(data.len());
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

fn median_gap(indices: &[usize]) -> Option<usize> {
    let mut gaps: Vec<usize> = indices.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_unstable();
    Some(gaps[gaps.len() / 2])
}
