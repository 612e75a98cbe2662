//! CSV ingest of calibration data.
//!
//! Expected layout (one header row, then one point per row):
//!
//! ```text
//! temperature_c,resistance_ohm
//! 25.0,10000
//! 20.0,12490
//! ```
//!
//! Design goals:
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (input order is preserved)
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::warn;

use crate::domain::CalibrationPoint;
use crate::error::AppError;

/// Summary stats about the points actually used for fitting.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_points: usize,
    pub resistance_min: f64,
    pub resistance_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed points + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub points: Vec<CalibrationPoint>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load calibration points from a CSV file.
pub fn load_calibration_points(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_calibration_points(file)
}

/// Parse calibration points from any reader (first row is a header).
pub fn read_calibration_points<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        match parse_row(&record) {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for e in &row_errors {
        warn!("skipping CSV line {}: {}", e.line, e.message);
    }

    let stats = compute_stats(&points)
        .ok_or_else(|| AppError::new(3, "Data file is empty: no valid calibration rows."))?;

    Ok(IngestedData {
        points,
        stats,
        row_errors,
        rows_read,
    })
}

fn parse_row(record: &StringRecord) -> Result<CalibrationPoint, String> {
    let temperature = parse_field(record, 0, "temperature")?;
    let resistance = parse_field(record, 1, "resistance")?;
    if resistance <= 0.0 {
        return Err(format!("resistance must be positive, got {resistance}"));
    }
    Ok(CalibrationPoint::new(resistance, temperature))
}

fn parse_field(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {name} (column {})", idx + 1))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("invalid {name} '{raw}'"))?;
    if !v.is_finite() {
        return Err(format!("non-finite {name} '{raw}'"));
    }
    Ok(v)
}

fn compute_stats(points: &[CalibrationPoint]) -> Option<DatasetStats> {
    if points.is_empty() {
        return None;
    }
    let mut stats = DatasetStats {
        n_points: points.len(),
        resistance_min: f64::INFINITY,
        resistance_max: f64::NEG_INFINITY,
        temperature_min: f64::INFINITY,
        temperature_max: f64::NEG_INFINITY,
    };
    for p in points {
        stats.resistance_min = stats.resistance_min.min(p.resistance);
        stats.resistance_max = stats.resistance_max.max(p.resistance);
        stats.temperature_min = stats.temperature_min.min(p.temperature);
        stats.temperature_max = stats.temperature_max.max(p.temperature);
    }
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_temperature_then_resistance() {
        let csv = "T,R\n25,10000\n20.5, 12490.5\n-5,42000\n";
        let data = read_calibration_points(csv.as_bytes()).unwrap();

        assert_eq!(data.rows_read, 3);
        assert!(data.row_errors.is_empty());
        assert_eq!(
            data.points,
            vec![
                CalibrationPoint::new(10_000.0, 25.0),
                CalibrationPoint::new(12_490.5, 20.5),
                CalibrationPoint::new(42_000.0, -5.0),
            ]
        );
        assert_eq!(data.stats.n_points, 3);
        assert_eq!(data.stats.resistance_min, 10_000.0);
        assert_eq!(data.stats.resistance_max, 42_000.0);
        assert_eq!(data.stats.temperature_min, -5.0);
        assert_eq!(data.stats.temperature_max, 25.0);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let csv = "T,R\n25,10000\nabc,12000\n30\n35,-1\n40,5000,extra\n";
        let data = read_calibration_points(csv.as_bytes()).unwrap();

        assert_eq!(data.points.len(), 2);
        assert_eq!(data.rows_read, 5);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(data.row_errors[0].message.contains("invalid temperature"));
        assert!(data.row_errors[1].message.contains("missing resistance"));
        assert!(data.row_errors[2].message.contains("must be positive"));
    }

    #[test]
    fn blank_rows_are_ignored() {
        let csv = "T,R\n25,10000\n,\n30,8000\n";
        let data = read_calibration_points(csv.as_bytes()).unwrap();
        assert_eq!(data.points.len(), 2);
        assert!(data.row_errors.is_empty());
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = read_calibration_points("T,R\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = load_calibration_points(Path::new("/nonexistent/sh-fit/data.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
