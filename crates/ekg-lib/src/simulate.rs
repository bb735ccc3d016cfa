//! Synthetic single-lead ECG built from Gaussian P, Q, R, S and T waves.
//!
//! Waves are placed so that the PR and QT intervals measured with the
//! 10 %-of-amplitude convention match the requested values.

use crate::{
    error::{EkgError, Result},
    signal::TimeSeries,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Distance from a Gaussian's centre to its 10 % point, in standard deviations.
const TENTH_POINT_SIGMAS: f64 = 2.146;
/// Nominal QRS onset ahead of the R-peak (seconds).
const QRS_ONSET_S: f64 = 0.034;
const P_SIGMA_S: f64 = 0.020;
const T_SIGMA_S: f64 = 0.040;
/// Rate-corrected QT used when no explicit QT is requested (Bazett).
const DEFAULT_QTC_S: f64 = 0.400;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub duration_s: f64,
    pub heart_rate_bpm: f64,
    /// Standard deviation of additive white noise.
    pub noise: f64,
    pub sampling_rate: u32,
    pub pr_ms: f64,
    /// Fixed QT; `None` derives it from the RR interval.
    pub qt_ms: Option<f64>,
    /// Standard deviation of beat-to-beat RR jitter (seconds).
    pub rr_jitter_s: f64,
    /// Amplitude of a 0.2 Hz baseline wander.
    pub baseline_wander: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            heart_rate_bpm: 75.0,
            noise: 0.05,
            sampling_rate: 1000,
            pr_ms: 160.0,
            qt_ms: None,
            rr_jitter_s: 0.0,
            baseline_wander: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Wave {
    offset_s: f64,
    sigma_s: f64,
    amplitude: f64,
}

impl Wave {
    fn at(&self, t: f64) -> f64 {
        let x = (t - self.offset_s) / self.sigma_s;
        self.amplitude * (-0.5 * x * x).exp()
    }
}

fn beat_waves(rr_s: f64, cfg: &SimulationConfig) -> [Wave; 5] {
    let pr = cfg.pr_ms / 1000.0;
    let qt = cfg
        .qt_ms
        .map(|ms| ms / 1000.0)
        .unwrap_or(DEFAULT_QTC_S * rr_s.sqrt());
    [
        Wave {
            offset_s: -(QRS_ONSET_S + pr) + TENTH_POINT_SIGMAS * P_SIGMA_S,
            sigma_s: P_SIGMA_S,
            amplitude: 0.15,
        },
        Wave {
            offset_s: -0.025,
            sigma_s: 0.008,
            amplitude: -0.1,
        },
        Wave {
            offset_s: 0.0,
            sigma_s: 0.010,
            amplitude: 1.0,
        },
        Wave {
            offset_s: 0.025,
            sigma_s: 0.008,
            amplitude: -0.2,
        },
        Wave {
            offset_s: -QRS_ONSET_S + qt - TENTH_POINT_SIGMAS * T_SIGMA_S,
            sigma_s: T_SIGMA_S,
            amplitude: 0.3,
        },
    ]
}

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// R-peak times (seconds). The first beat sits half an RR interval in.
pub fn beat_times(cfg: &SimulationConfig) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    beat_times_with(cfg, &mut rng)
}

fn beat_times_with(cfg: &SimulationConfig, rng: &mut StdRng) -> Vec<f64> {
    let base_rr = 60.0 / cfg.heart_rate_bpm;
    let mut times = Vec::new();
    let mut t = base_rr / 2.0;
    while t < cfg.duration_s {
        times.push(t);
        let jitter = if cfg.rr_jitter_s > 0.0 {
            cfg.rr_jitter_s * gaussian(rng)
        } else {
            0.0
        };
        t += (base_rr + jitter).max(0.2);
    }
    times
}

/// Generate a recording from `cfg`. The same config always yields the same samples.
pub fn simulate(cfg: &SimulationConfig) -> Result<TimeSeries> {
    if cfg.sampling_rate == 0 {
        return Err(EkgError::InvalidInput(
            "sampling rate must be positive".into(),
        ));
    }
    if !(cfg.duration_s > 0.0) {
        return Err(EkgError::InvalidInput(format!(
            "duration must be positive (got {})",
            cfg.duration_s
        )));
    }
    if !(cfg.heart_rate_bpm > 0.0 && cfg.heart_rate_bpm <= 300.0) {
        return Err(EkgError::InvalidInput(format!(
            "heart rate must be in (0, 300] bpm (got {})",
            cfg.heart_rate_bpm
        )));
    }

    let fs = cfg.sampling_rate as f64;
    let n = (cfg.duration_s * fs).round() as usize;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let beats = beat_times_with(cfg, &mut rng);

    let mut data = vec![0.0; n];
    for (k, &r) in beats.iter().enumerate() {
        let rr = beats
            .get(k + 1)
            .map(|next| next - r)
            .unwrap_or(60.0 / cfg.heart_rate_bpm);
        let waves = beat_waves(rr, cfg);
        let lo = ((r - 0.6) * fs).floor().max(0.0) as usize;
        let hi = (((r + 0.8) * fs).ceil() as usize).min(n);
        for (i, sample) in data.iter_mut().enumerate().take(hi).skip(lo) {
            let t = i as f64 / fs - r;
            *sample += waves.iter().map(|w| w.at(t)).sum::<f64>();
        }
    }

    if cfg.baseline_wander != 0.0 {
        for (i, sample) in data.iter_mut().enumerate() {
            *sample += cfg.baseline_wander * (2.0 * PI * 0.2 * i as f64 / fs).sin();
        }
    }
    if cfg.noise > 0.0 {
        for sample in data.iter_mut() {
            *sample += cfg.noise * gaussian(&mut rng);
        }
    }

    log::debug!(
        "simulated {:.1} s at {} Hz with {} beat(s)",
        cfg.duration_s,
        cfg.sampling_rate,
        beats.len()
    );
    Ok(TimeSeries::new(cfg.sampling_rate, data))
}
