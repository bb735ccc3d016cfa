use crate::error::{EkgError, Result};
use ::csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// Read one column of a CSV as samples.
///
/// `column` selects a header by name (case-insensitive); without it the first
/// column is used. A first row whose selected cell is numeric is treated as
/// data, so header-less files load too.
pub fn read_column<R: Read>(input: R, column: Option<&str>) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(input);
    let mut records = reader.records();

    let first = match records.next() {
        Some(record) => record?,
        None => return Err(EkgError::InvalidInput("CSV input is empty".into())),
    };
    let idx = match column {
        Some(name) => first
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| EkgError::InvalidInput(format!("missing column '{name}'")))?,
        None => 0,
    };

    let mut out = Vec::new();
    if column.is_none() {
        if let Some(v) = first.get(idx).and_then(|cell| cell.parse::<f64>().ok()) {
            out.push(v);
        }
    }
    for (row, record) in records.enumerate() {
        let record = record?;
        // row 0 of the iterator is line 2 of the file
        let line = row + 2;
        let cell = record.get(idx).ok_or_else(|| EkgError::Parse {
            line,
            value: String::new(),
        })?;
        if cell.is_empty() {
            continue;
        }
        let value = cell.parse::<f64>().map_err(|_| EkgError::Parse {
            line,
            value: cell.to_string(),
        })?;
        out.push(value);
    }
    if out.is_empty() {
        return Err(EkgError::InvalidInput("no numeric samples found".into()));
    }
    Ok(out)
}

pub fn read_csv_column(path: &Path, column: Option<&str>) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let samples = read_column(file, column)?;
    log::debug!(
        "read {} sample(s) from column {} of {}",
        samples.len(),
        column.unwrap_or("#0"),
        path.display()
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_column_with_header() {
        let data = "ecg,resp\n0.1,5\n0.2,6\n-0.3,7\n";
        assert_eq!(read_column(data.as_bytes(), None).unwrap(), vec![0.1, 0.2, -0.3]);
    }

    #[test]
    fn first_column_without_header() {
        let data = "0.5,1\n0.6,2\n";
        assert_eq!(read_column(data.as_bytes(), None).unwrap(), vec![0.5, 0.6]);
    }

    #[test]
    fn named_column() {
        let data = "time, ECG\n0.000, 0.1\n0.001, 0.4\n";
        assert_eq!(
            read_column(data.as_bytes(), Some("ecg")).unwrap(),
            vec![0.1, 0.4]
        );
    }

    #[test]
    fn missing_column_is_invalid() {
        let err = read_column("a,b\n1,2\n".as_bytes(), Some("ecg")).unwrap_err();
        assert!(err.to_string().contains("ecg"));
    }

    #[test]
    fn bad_cell_reports_line() {
        let err = read_column("ecg\n0.1\nx\n".as_bytes(), None).unwrap_err();
        assert!(matches!(err, EkgError::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecg.csv");
        std::fs::write(&path, "ecg\n1.0\n2.0\n").unwrap();
        assert_eq!(read_csv_column(&path, None).unwrap(), vec![1.0, 2.0]);
    }
}
