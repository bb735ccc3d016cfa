pub mod cache;
pub mod config;
pub mod detectors;
pub mod error;
pub mod filter;
pub mod interpret;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod signal;
pub mod simulate;

pub use config::AnalysisConfig;
pub use error::{EkgError, Result};
pub use interpret::{Finding, Recommendation, Severity};
pub use metrics::{MetricValue, Metrics};
pub use pipeline::{analyze, assemble, AnalysisResult};
pub use signal::*;
