use crate::{error::Result, pipeline::AnalysisResult};
use std::io::Write;

/// Metrics table with `metric,unit,value` rows. Unavailable values are left empty.
pub fn write_metrics_csv<W: Write>(out: W, result: &AnalysisResult) -> Result<()> {
    let mut writer = ::csv::Writer::from_writer(out);
    writer.write_record(["metric", "unit", "value"])?;
    for (name, unit, value) in result.metrics.entries() {
        let cell = value.value().map(|v| v.to_string()).unwrap_or_default();
        writer.write_record([name, unit, cell.as_str()])?;
    }
    writer.write_record([
        "beat_count",
        "count",
        result.metrics.beat_count.to_string().as_str(),
    ])?;
    writer.flush()?;
    Ok(())
}

/// Findings table with `condition,severity` rows, in evaluation order.
pub fn write_findings_csv<W: Write>(out: W, result: &AnalysisResult) -> Result<()> {
    let mut writer = ::csv::Writer::from_writer(out);
    writer.write_record(["condition", "severity"])?;
    for finding in &result.findings {
        writer.write_record([finding.condition.as_str(), finding.severity.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_result_json<W: Write>(mut out: W, result: &AnalysisResult, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, result)?;
    } else {
        serde_json::to_writer(&mut out, result)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        interpret::{Finding, Severity},
        metrics::{MetricValue, Metrics},
        pipeline::assemble,
        signal::Events,
    };

    fn result() -> AnalysisResult {
        let metrics = Metrics {
            heart_rate_bpm: MetricValue::Available(72.5),
            beat_count: 3,
            ..Metrics::default()
        };
        assemble(
            250,
            vec![0.0; 10],
            Events::from_indices(vec![1, 4, 7]),
            metrics,
            vec![Finding::new("PR interval not available", Severity::Info)],
        )
    }

    #[test]
    fn metrics_csv_has_one_row_per_metric() {
        let mut buf = Vec::new();
        write_metrics_csv(&mut buf, &result()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "metric,unit,value");
        assert_eq!(lines[1], "heart_rate,bpm,72.5");
        assert_eq!(lines[2], "rmssd,ms,");
        assert_eq!(lines.len(), 1 + 8 + 1);
        assert_eq!(lines[9], "beat_count,count,3");
    }

    #[test]
    fn findings_csv_keeps_order() {
        let mut buf = Vec::new();
        write_findings_csv(&mut buf, &result()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "condition,severity\nPR interval not available,info\n"
        );
    }

    #[test]
    fn json_is_one_line_unless_pretty() {
        let mut buf = Vec::new();
        write_result_json(&mut buf, &result(), false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["sampling_rate"], 250);
        assert_eq!(value["metrics"]["heart_rate_bpm"]["value"], 72.5);
    }
}
