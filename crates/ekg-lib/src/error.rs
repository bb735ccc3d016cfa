use thiserror::Error;

/// Errors raised by the analysis pipeline and its loaders.
///
/// Missing metrics are not errors; they travel as
/// [`MetricValue::Unavailable`](crate::metrics::MetricValue::Unavailable).
#[derive(Debug, Error)]
pub enum EkgError {
    /// Empty signal, zero sampling rate or an inconsistent parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The sampling rate cannot represent the band-pass upper cutoff.
    #[error(
        "sampling rate {sampling_rate} Hz is too low for a {high_cutoff_hz} Hz cutoff (needs more than {} Hz)",
        2.0 * high_cutoff_hz
    )]
    InvalidSamplingRate {
        sampling_rate: u32,
        high_cutoff_hz: f64,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("line {line} is not a number: {value}")]
    Parse { line: usize, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EkgError>;
