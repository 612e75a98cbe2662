//! CSV exports.
//!
//! - the results file (coefficients, SSE, per-point residuals, verdict), in the
//!   layout the calibration spreadsheets already consume
//! - calibration data in the same format `ingest` reads

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;

use crate::domain::{CalibrationPoint, FitResult};
use crate::error::AppError;

/// Write the fit results CSV to `path`.
pub fn write_results_csv(path: &Path, result: &FitResult) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results CSV '{}': {e}", path.display())))?;
    write_results(&mut file, result)
        .map_err(|e| AppError::new(2, format!("Failed to write results CSV: {e}")))?;
    info!("wrote results to {}", path.display());
    Ok(())
}

/// Results layout:
///
/// ```text
/// a,b,c,d,SSE
/// <a0>,<a1>,<a2>,<a3>,<sse>
///
/// Tdiffs
/// <residual>
/// ...
///
///
/// <verdict message>
/// ```
pub fn write_results<W: Write>(out: &mut W, result: &FitResult) -> std::io::Result<()> {
    let p = &result.params;
    writeln!(out, "a,b,c,d,SSE")?;
    writeln!(out, "{},{},{},{},{}", p.a0, p.a1, p.a2, p.a3, result.sse)?;
    writeln!(out)?;
    writeln!(out, "Tdiffs")?;
    for r in &result.residuals {
        writeln!(out, "{r}")?;
    }
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "{}", result.verdict.message(result.sse_threshold))?;
    Ok(())
}

/// Write calibration points as `temperature_c,resistance_ohm` rows.
pub fn write_calibration_csv(path: &Path, points: &[CalibrationPoint]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create data CSV '{}': {e}", path.display())))?;
    write_calibration(file, points)
        .map_err(|e| AppError::new(2, format!("Failed to write data CSV: {e}")))?;
    info!("wrote {} calibration points to {}", points.len(), path.display());
    Ok(())
}

pub fn write_calibration<W: Write>(out: W, points: &[CalibrationPoint]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["temperature_c", "resistance_ohm"])?;
    for p in points {
        writer.write_record([p.temperature.to_string(), p.resistance.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
