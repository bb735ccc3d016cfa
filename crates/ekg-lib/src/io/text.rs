use crate::error::{EkgError, Result};
use std::io::Write;
use std::path::Path;

/// Parse one sample per line, ignoring blank and `#` comment lines.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed.parse().map_err(|_| EkgError::Parse {
            line: idx + 1,
            value: trimmed.to_string(),
        })?;
        out.push(val);
    }
    if out.is_empty() {
        return Err(EkgError::InvalidInput("no numeric samples found".into()));
    }
    Ok(out)
}

pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)?;
    let samples = parse_samples(&text)?;
    log::debug!("read {} sample(s) from {}", samples.len(), path.display());
    Ok(samples)
}

/// Write one sample per line.
pub fn write_samples<W: Write>(mut out: W, samples: &[f64]) -> Result<()> {
    for x in samples {
        writeln!(out, "{x}")?;
    }
    out.flush()?;
    Ok(())
}
