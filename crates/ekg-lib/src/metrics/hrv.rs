use crate::{metrics::MetricValue, signal::RRSeries};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fewest RR intervals for which the variability statistics are defined.
pub const MIN_RR_FOR_HRV: usize = 2;

/// Resampling rate of the RR tachogram for spectral analysis (Hz).
pub const PSD_RESAMPLE_HZ: f64 = 4.0;

pub const LF_BAND: (f64, f64) = (0.04, 0.15);
pub const HF_BAND: (f64, f64) = (0.15, 0.4);

/// Time-domain HRV. Durations are in milliseconds, pNN50 is a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvTime {
    pub n: usize,
    pub avnn_ms: MetricValue,
    pub sdnn_ms: MetricValue,
    pub rmssd_ms: MetricValue,
    pub pnn50: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvPsd {
    pub lf: f64,
    pub hf: f64,
    pub total_power: f64,
    pub lf_hf: MetricValue,
    pub points: Vec<[f64; 2]>,
}

pub fn hrv_time(rr: &RRSeries) -> HrvTime {
    let n = rr.len();
    let avnn_ms = MetricValue::from(rr.mean().map(|m| m * 1000.0));
    if n < MIN_RR_FOR_HRV {
        return HrvTime {
            n,
            avnn_ms,
            sdnn_ms: MetricValue::Unavailable,
            rmssd_ms: MetricValue::Unavailable,
            pnn50: MetricValue::Unavailable,
        };
    }

    let mean = rr.rr.iter().sum::<f64>() / n as f64;
    let sdnn = (rr.rr.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt();
    let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
    let nn50 = diffs.iter().filter(|d| d.abs() > 0.050).count();
    let pnn50 = nn50 as f64 / diffs.len() as f64;

    HrvTime {
        n,
        avnn_ms,
        sdnn_ms: MetricValue::Available(sdnn * 1000.0),
        rmssd_ms: MetricValue::Available(rmssd * 1000.0),
        pnn50: MetricValue::Available(pnn50),
    }
}

/// Welch PSD of the RR tachogram and its LF/HF band powers.
///
/// Returns `None` when there are too few intervals to build a tachogram.
/// LF/HF is unavailable when the HF band carries no power.
pub fn hrv_psd(rr: &RRSeries, fs_interp: f64) -> Option<HrvPsd> {
    if rr.len() < MIN_RR_FOR_HRV || fs_interp <= 0.0 {
        return None;
    }
    let (freqs, powers) = welch_psd(rr, fs_interp)?;
    let total_power: f64 = powers.iter().sum();
    let lf = integrate_band(&freqs, &powers, LF_BAND);
    let hf = integrate_band(&freqs, &powers, HF_BAND);
    let lf_hf = if hf > f64::EPSILON {
        MetricValue::Available(lf / hf)
    } else {
        MetricValue::Unavailable
    };
    Some(HrvPsd {
        lf,
        hf,
        total_power,
        lf_hf,
        points: freqs
            .into_iter()
            .zip(powers)
            .map(|(f, p)| [f, p])
            .collect(),
    })
}

pub fn lf_hf_ratio(rr: &RRSeries) -> MetricValue {
    hrv_psd(rr, PSD_RESAMPLE_HZ)
        .map(|psd| psd.lf_hf)
        .unwrap_or(MetricValue::Unavailable)
}

fn integrate_band(freqs: &[f64], powers: &[f64], band: (f64, f64)) -> f64 {
    freqs
        .iter()
        .zip(powers)
        .filter(|(f, _)| **f >= band.0 && **f < band.1)
        .map(|(_, p)| *p)
        .sum()
}

fn welch_psd(rr: &RRSeries, fs_interp: f64) -> Option<(Vec<f64>, Vec<f64>)> {
    let mut signal = interpolate_rr_ms(rr, fs_interp);
    let n = signal.len();
    if n < 4 {
        return None;
    }
    let mean = signal.iter().sum::<f64>() / n as f64;
    for v in signal.iter_mut() {
        *v -= mean;
    }

    let window = ((fs_interp * 30.0).max(4.0).min(n as f64)) as usize;
    let step = (window / 2).max(1);
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(window);
    let window_func = hann(window);
    let freqs: Vec<f64> = (0..window / 2 + 1)
        .map(|k| k as f64 * fs_interp / window as f64)
        .collect();
    let mut powers = vec![0.0; freqs.len()];
    let mut spectrum = r2c.make_output_vec();
    let mut segments = 0;
    let mut pos = 0;
    while pos + window <= n {
        let mut frame: Vec<f64> = signal[pos..pos + window]
            .iter()
            .zip(&window_func)
            .map(|(x, w)| x * w)
            .collect();
        r2c.process(&mut frame, &mut spectrum).ok()?;
        let scale = 1.0 / window as f64;
        for (k, val) in spectrum.iter().enumerate() {
            let one_sided = if k == 0 || (window % 2 == 0 && k == window / 2) {
                1.0
            } else {
                2.0
            };
            powers[k] += one_sided * val.norm_sqr() * scale;
        }
        segments += 1;
        pos += step;
    }
    for p in powers.iter_mut() {
        *p /= segments as f64;
    }
    Some((freqs, powers))
}

/// Linear interpolation of the RR series (ms) on a uniform grid starting at the
/// end of the first interval.
fn interpolate_rr_ms(rr: &RRSeries, fs: f64) -> Vec<f64> {
    let mut times = Vec::with_capacity(rr.len());
    let mut acc = 0.0;
    for interval in &rr.rr {
        acc += interval;
        times.push(acc);
    }
    let (Some(&start), Some(&end)) = (times.first(), times.last()) else {
        return Vec::new();
    };
    let n = ((end - start) * fs).floor() as usize + 1;
    let mut out = Vec::with_capacity(n);
    let mut idx = 0;
    for i in 0..n {
        let t = start + i as f64 / fs;
        while idx + 2 < times.len() && times[idx + 1] < t {
            idx += 1;
        }
        let value = if idx + 1 < times.len() {
            let (t0, t1) = (times[idx], times[idx + 1]);
            let (v0, v1) = (rr.rr[idx], rr.rr[idx + 1]);
            let frac = if t1 > t0 {
                ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            v0 + frac * (v1 - v0)
        } else {
            rr.rr[idx]
        };
        out.push(value * 1000.0);
    }
    out
}

fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn two_intervals_give_time_domain_metrics() {
        let rr = RRSeries { rr: vec![0.5, 0.7] };
        let m = hrv_time(&rr);
        assert_eq!(m.n, 2);
        assert_close(m.avnn_ms.value().unwrap(), 600.0, 1e-9);
        assert_close(m.sdnn_ms.value().unwrap(), 141.4213562373095, 1e-6);
        assert_close(m.rmssd_ms.value().unwrap(), 200.0, 1e-6);
        assert_close(m.pnn50.value().unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn known_series_metrics() {
        let rr = RRSeries {
            rr: vec![0.8, 0.9, 0.8, 1.0],
        };
        let m = hrv_time(&rr);
        assert_close(m.rmssd_ms.value().unwrap(), 0.02f64.sqrt() * 1000.0, 1e-6);
        assert_close(m.sdnn_ms.value().unwrap(), 95.74271077563381, 1e-6);
        assert_close(m.pnn50.value().unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn single_interval_is_unavailable() {
        let rr = RRSeries { rr: vec![0.8] };
        let m = hrv_time(&rr);
        assert_eq!(m.sdnn_ms, MetricValue::Unavailable);
        assert_eq!(m.rmssd_ms, MetricValue::Unavailable);
        assert_eq!(m.pnn50, MetricValue::Unavailable);
        assert!(m.avnn_ms.is_available());
        assert!(hrv_psd(&rr, PSD_RESAMPLE_HZ).is_none());
        assert_eq!(lf_hf_ratio(&rr), MetricValue::Unavailable);
    }

    #[test]
    fn constant_rhythm_has_no_spectral_ratio() {
        let rr = RRSeries { rr: vec![0.8; 60] };
        let psd = hrv_psd(&rr, PSD_RESAMPLE_HZ).unwrap();
        assert!(psd.total_power < 1e-9);
        assert_eq!(psd.lf_hf, MetricValue::Unavailable);
    }

    #[test]
    fn respiratory_modulation_dominates_hf() {
        // 0.25 Hz modulation of a 0.8 s rhythm sits in the HF band.
        let mut rr = Vec::new();
        let mut t = 0.0;
        while t < 240.0 {
            let v = 0.8 + 0.05 * (2.0 * PI * 0.25 * t).sin();
            rr.push(v);
            t += v;
        }
        let psd = hrv_psd(&RRSeries { rr }, PSD_RESAMPLE_HZ).unwrap();
        assert!(psd.hf > psd.lf);
        assert!(psd.lf_hf.value().unwrap() < 1.0);
    }

    #[test]
    fn baroreflex_modulation_dominates_lf() {
        let mut rr = Vec::new();
        let mut t = 0.0;
        while t < 240.0 {
            let v = 0.9 + 0.05 * (2.0 * PI * 0.1 * t).sin();
            rr.push(v);
            t += v;
        }
        let psd = hrv_psd(&RRSeries { rr }, PSD_RESAMPLE_HZ).unwrap();
        assert!(psd.lf_hf.value().unwrap() > 1.0);
    }

    #[test]
    fn interpolation_passes_through_samples() {
        let rr = RRSeries {
            rr: vec![1.0, 1.0, 2.0],
        };
        let grid = interpolate_rr_ms(&rr, 1.0);
        // grid times 1.0, 2.0, 3.0, 4.0 measured from the first beat
        assert_eq!(grid.len(), 4);
        assert_close(grid[0], 1000.0, 1e-9);
        assert_close(grid[1], 1000.0, 1e-9);
        assert_close(grid[2], 1500.0, 1e-9);
        assert_close(grid[3], 2000.0, 1e-9);
    }
}
