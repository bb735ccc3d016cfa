pub mod csv;
pub mod export;
pub mod text;

use crate::error::Result;
use std::path::Path;

/// Load samples from `path`, choosing the CSV reader for `.csv` files and the
/// one-value-per-line reader otherwise.
pub fn read_signal(path: &Path, column: Option<&str>) -> Result<Vec<f64>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv || column.is_some() {
        self::csv::read_csv_column(path, column)
    } else {
        self::text::read_samples(path)
    }
}
