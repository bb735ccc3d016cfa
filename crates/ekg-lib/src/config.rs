use crate::error::{EkgError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable parameters for filtering, beat detection and the interpretation rules.
///
/// Every field has a default; a TOML file only needs the keys it overrides.
/// The defaults are illustrative heuristics, not validated clinical limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum filtered amplitude for an R-peak candidate.
    pub min_peak_height: f64,
    /// Refractory period between accepted R-peaks (seconds).
    pub min_peak_distance_s: f64,
    /// Band-pass lower cutoff (Hz), removes baseline wander.
    pub bandpass_low_hz: f64,
    /// Band-pass upper cutoff (Hz), removes muscle and mains noise.
    pub bandpass_high_hz: f64,
    pub tachycardia_bpm: f64,
    pub bradycardia_bpm: f64,
    pub pr_high_ms: f64,
    pub pr_low_ms: f64,
    pub qt_high_ms: f64,
    pub qt_low_ms: f64,
    /// RR standard deviation above which variability is flagged (seconds).
    pub rr_std_threshold_s: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_peak_height: 0.5,
            min_peak_distance_s: 0.6,
            bandpass_low_hz: 0.5,
            bandpass_high_hz: 40.0,
            tachycardia_bpm: 100.0,
            bradycardia_bpm: 60.0,
            pr_high_ms: 200.0,
            pr_low_ms: 120.0,
            qt_high_ms: 420.0,
            qt_low_ms: 350.0,
            rr_std_threshold_s: 0.16,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EkgError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&text)?;
        log::debug!("loaded analysis config from {}", path.display());
        Ok(cfg)
    }

    /// Bit patterns of every field, in declaration order. Used as a cache key.
    pub fn key_bits(&self) -> [u64; 11] {
        [
            self.min_peak_height.to_bits(),
            self.min_peak_distance_s.to_bits(),
            self.bandpass_low_hz.to_bits(),
            self.bandpass_high_hz.to_bits(),
            self.tachycardia_bpm.to_bits(),
            self.bradycardia_bpm.to_bits(),
            self.pr_high_ms.to_bits(),
            self.pr_low_ms.to_bits(),
            self.qt_high_ms.to_bits(),
            self.qt_low_ms.to_bits(),
            self.rr_std_threshold_s.to_bits(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = AnalysisConfig::from_toml_str("min_peak_distance_s = 0.3\nqt_high_ms = 450.0\n")
            .expect("parse config");
        assert_eq!(cfg.min_peak_distance_s, 0.3);
        assert_eq!(cfg.qt_high_ms, 450.0);
        assert_eq!(cfg.min_peak_height, 0.5);
        assert_eq!(cfg.bandpass_high_hz, 40.0);
        assert_eq!(cfg.rr_std_threshold_s, 0.16);
    }

    #[test]
    fn rejects_wrong_types() {
        let err = AnalysisConfig::from_toml_str("min_peak_height = \"high\"").unwrap_err();
        assert!(matches!(err, EkgError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tachycardia_bpm = 110.0").unwrap();
        let cfg = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(cfg.tachycardia_bpm, 110.0);
        assert_eq!(cfg.bradycardia_bpm, 60.0);
    }

    #[test]
    fn key_bits_change_with_any_field() {
        let base = AnalysisConfig::default();
        let mut other = base;
        other.rr_std_threshold_s = 0.2;
        assert_ne!(base.key_bits(), other.key_bits());
        assert_eq!(base.key_bits(), AnalysisConfig::default().key_bits());
    }
}
