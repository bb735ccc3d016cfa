use crate::{
    config::AnalysisConfig,
    detectors::ecg::detect_beats,
    error::{EkgError, Result},
    filter::filter_with_config,
    interpret::{interpret_with, recommend, Finding, Recommendation},
    metrics::{extract_metrics, Metrics},
    signal::{Events, RRSeries},
};
use serde::{Deserialize, Serialize};

/// Everything one analysis produced. Owns its data; nothing is shared with the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sampling_rate: u32,
    pub filtered: Vec<f64>,
    pub peaks: Events,
    pub rr: RRSeries,
    pub metrics: Metrics,
    pub findings: Vec<Finding>,
    pub recommendation: Recommendation,
}

impl AnalysisResult {
    /// R-peak positions in seconds.
    pub fn peak_times(&self) -> Vec<f64> {
        let fs = self.sampling_rate.max(1) as f64;
        self.peaks.indices.iter().map(|&i| i as f64 / fs).collect()
    }
}

/// Package the stage outputs. Inputs are taken as already validated.
pub fn assemble(
    sampling_rate: u32,
    filtered: Vec<f64>,
    peaks: Events,
    metrics: Metrics,
    findings: Vec<Finding>,
) -> AnalysisResult {
    let rr = RRSeries::from_events(&peaks, sampling_rate);
    let recommendation = recommend(&findings);
    AnalysisResult {
        sampling_rate,
        filtered,
        peaks,
        rr,
        metrics,
        findings,
        recommendation,
    }
}

/// Filter, detect, measure and interpret one recording.
///
/// Fails only on invalid input (empty signal, zero rate) or when the sampling
/// rate cannot carry the band-pass upper cutoff. A recording without beats is
/// a successful analysis whose metrics are unavailable.
pub fn analyze(signal: &[f64], sampling_rate: u32, cfg: &AnalysisConfig) -> Result<AnalysisResult> {
    if signal.is_empty() {
        return Err(EkgError::InvalidInput("signal is empty".into()));
    }
    if sampling_rate == 0 {
        return Err(EkgError::InvalidInput(
            "sampling rate must be positive".into(),
        ));
    }

    let filtered = filter_with_config(signal, sampling_rate, cfg)?;
    let detection = detect_beats(&filtered, sampling_rate, cfg);
    let metrics = Metrics {
        heart_rate_bpm: detection.heart_rate_bpm,
        ..extract_metrics(&filtered, &detection.peaks, sampling_rate)
    };
    let findings = interpret_with(&metrics, cfg);
    log::info!(
        "analyzed {} sample(s) at {} Hz: {} beat(s), {} finding(s)",
        signal.len(),
        sampling_rate,
        detection.peaks.len(),
        findings.len()
    );
    for finding in &findings {
        log::debug!("finding: {} ({})", finding.condition, finding.severity);
    }
    Ok(assemble(
        sampling_rate,
        filtered,
        detection.peaks,
        metrics,
        findings,
    ))
}
