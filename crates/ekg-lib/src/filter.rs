//! Zero-phase Butterworth band-pass used to clean the raw lead before beat detection.

use crate::config::AnalysisConfig;
use crate::error::{EkgError, Result};
use std::f64::consts::PI;

/// Order of each Butterworth edge (low-pass and high-pass).
pub const BUTTERWORTH_ORDER: usize = 4;

/// Second-order section, Direct Form II transposed, `a0` normalized to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    fn lowpass(cutoff_hz: f64, fs: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos) / a0;
        let b0 = b1 / 2.0;
        Self {
            b: [b0, b1, b0],
            a: [-2.0 * cos / a0, (1.0 - alpha) / a0],
        }
    }

    fn highpass(cutoff_hz: f64, fs: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / fs;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        let b1 = -(1.0 + cos) / a0;
        let b0 = -b1 / 2.0;
        Self {
            b: [b0, b1, b0],
            a: [-2.0 * cos / a0, (1.0 - alpha) / a0],
        }
    }

    pub fn dc_gain(&self) -> f64 {
        let den = 1.0 + self.a[0] + self.a[1];
        if den.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.b[0] + self.b[1] + self.b[2]) / den
    }

    /// Filter state that makes a constant input `x0` produce a constant output.
    fn steady_state(&self, x0: f64) -> [f64; 2] {
        let y = self.dc_gain() * x0;
        let s1 = self.b[2] * x0 - self.a[1] * y;
        let s0 = self.b[1] * x0 - self.a[0] * y + s1;
        [s0, s1]
    }

    fn run(&self, data: &mut [f64]) {
        let Some(&first) = data.first() else {
            return;
        };
        let mut state = self.steady_state(first);
        for x in data.iter_mut() {
            let input = *x;
            let y = self.b[0] * input + state[0];
            state[0] = self.b[1] * input - self.a[0] * y + state[1];
            state[1] = self.b[2] * input - self.a[1] * y;
            *x = y;
        }
    }
}

/// Q factor of the `k`-th biquad in an even-order Butterworth prototype.
fn butterworth_q(order: usize, k: usize) -> f64 {
    let theta = (2 * k + 1) as f64 * PI / (2 * order) as f64;
    1.0 / (2.0 * theta.sin())
}

/// Designed band-pass: low-pass sections followed by high-pass sections.
#[derive(Debug, Clone, PartialEq)]
pub struct BandpassFilter {
    sections: Vec<Biquad>,
}

impl BandpassFilter {
    /// Design a Butterworth band-pass for `sampling_rate`, validating the cutoffs.
    pub fn design(sampling_rate: u32, low_hz: f64, high_hz: f64) -> Result<Self> {
        if sampling_rate == 0 {
            return Err(EkgError::InvalidInput(
                "sampling rate must be positive".into(),
            ));
        }
        if !(low_hz > 0.0 && low_hz < high_hz) {
            return Err(EkgError::InvalidInput(format!(
                "band-pass cutoffs must satisfy 0 < low < high (got {low_hz} and {high_hz})"
            )));
        }
        let fs = sampling_rate as f64;
        if 2.0 * high_hz >= fs {
            return Err(EkgError::InvalidSamplingRate {
                sampling_rate,
                high_cutoff_hz: high_hz,
            });
        }
        let pairs = BUTTERWORTH_ORDER / 2;
        let mut sections = Vec::with_capacity(pairs * 2);
        for k in 0..pairs {
            sections.push(Biquad::lowpass(high_hz, fs, butterworth_q(BUTTERWORTH_ORDER, k)));
        }
        for k in 0..pairs {
            sections.push(Biquad::highpass(low_hz, fs, butterworth_q(BUTTERWORTH_ORDER, k)));
        }
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Single causal pass over `data`, in place.
    fn run(&self, data: &mut [f64]) {
        for section in &self.sections {
            section.run(data);
        }
    }

    /// Forward-backward filtering with odd-reflection padding at both edges.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        let pad = (3 * (2 * self.sections.len() + 1)).min(n - 1);
        let mut ext = Vec::with_capacity(n + 2 * pad);
        let first = signal[0];
        let last = signal[n - 1];
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.run(&mut ext);
        ext.reverse();
        self.run(&mut ext);
        ext.reverse();

        ext[pad..pad + n].to_vec()
    }
}

/// Band-pass `signal` between `low_hz` and `high_hz` without phase shift.
pub fn bandpass(signal: &[f64], sampling_rate: u32, low_hz: f64, high_hz: f64) -> Result<Vec<f64>> {
    if signal.is_empty() {
        return Err(EkgError::InvalidInput("signal is empty".into()));
    }
    if signal.iter().any(|x| !x.is_finite()) {
        return Err(EkgError::InvalidInput(
            "signal contains non-finite samples".into(),
        ));
    }
    let design = BandpassFilter::design(sampling_rate, low_hz, high_hz)?;
    Ok(design.filtfilt(signal))
}

/// Filter with the cutoffs from `cfg`.
pub fn filter_with_config(signal: &[f64], sampling_rate: u32, cfg: &AnalysisConfig) -> Result<Vec<f64>> {
    bandpass(signal, sampling_rate, cfg.bandpass_low_hz, cfg.bandpass_high_hz)
}

/// Filter with the default 0.5-40 Hz pass band.
pub fn filter(signal: &[f64], sampling_rate: u32) -> Result<Vec<f64>> {
    filter_with_config(signal, sampling_rate, &AnalysisConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: u32, seconds: f64) -> Vec<f64> {
        let n = (seconds * fs as f64) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs as f64).sin())
            .collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn rejects_low_sampling_rate() {
        let err = filter(&[0.0; 100], 80).unwrap_err();
        assert!(matches!(
            err,
            EkgError::InvalidSamplingRate {
                sampling_rate: 80,
                ..
            }
        ));
        assert!(filter(&[0.0; 100], 60).is_err());
        assert!(filter(&[0.0; 100], 81).is_ok());
    }

    #[test]
    fn rejects_empty_and_zero_rate() {
        assert!(matches!(filter(&[], 250), Err(EkgError::InvalidInput(_))));
        assert!(matches!(filter(&[1.0], 0), Err(EkgError::InvalidInput(_))));
        assert!(matches!(
            bandpass(&[1.0, 2.0], 250, 10.0, 5.0),
            Err(EkgError::InvalidInput(_))
        ));
        assert!(matches!(
            filter(&[1.0, f64::NAN], 250),
            Err(EkgError::InvalidInput(_))
        ));
    }

    #[test]
    fn sections_have_expected_gains() {
        let design = BandpassFilter::design(500, 0.5, 40.0).unwrap();
        assert_eq!(design.sections().len(), 4);
        let (lp, hp) = design.sections().split_at(2);
        for s in lp {
            assert!((s.dc_gain() - 1.0).abs() < 1e-9);
        }
        for s in hp {
            assert!(s.dc_gain().abs() < 1e-9);
        }
    }

    #[test]
    fn removes_dc_offset() {
        let out = filter(&vec![3.0; 2000], 500).unwrap();
        assert_eq!(out.len(), 2000);
        assert!(out.iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn passes_in_band_and_attenuates_out_of_band() {
        // The 0.5 Hz high-pass rings for seconds after an edge; measure well inside.
        let fs = 500;
        let window = 5000..10000;
        let passband = sine(10.0, fs, 30.0);
        let out = filter(&passband, fs).unwrap();
        let ratio = rms(&out[window.clone()]) / rms(&passband[window.clone()]);
        assert!(ratio > 0.95 && ratio < 1.05, "passband ratio {ratio}");

        let mains = sine(120.0, fs, 30.0);
        let out = filter(&mains, fs).unwrap();
        let ratio = rms(&out[window.clone()]) / rms(&mains[window]);
        assert!(ratio < 0.01, "stopband ratio {ratio}");
    }

    #[test]
    fn keeps_peak_position() {
        let fs = 500u32;
        let mut data = vec![0.0; 2000];
        let center = 1000usize;
        for (i, v) in data.iter_mut().enumerate() {
            let t = (i as f64 - center as f64) / fs as f64;
            *v = (-0.5 * (t / 0.02).powi(2)).exp();
        }
        let out = filter(&data, fs).unwrap();
        let argmax = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((argmax as isize - center as isize).abs() <= 1);
    }

    #[test]
    fn does_not_mutate_input() {
        let data = sine(5.0, 250, 2.0);
        let copy = data.clone();
        let _ = filter(&data, 250).unwrap();
        assert_eq!(data, copy);
    }
}
