//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot-friendly)

use crate::domain::{FitConfig, FitResult, PARAM_COUNT, PointResidual};
use crate::io::ingest::IngestedData;

const PARAM_NAMES: [&str; PARAM_COUNT] = ["a0", "a1", "a2", "a3"];

/// Format the run summary (dataset stats, coefficients, SSE, verdict, warnings).
pub fn format_run_summary(ingest: &IngestedData, result: &FitResult, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== shfit - 4-parameter Steinhart-Hart fit ===\n");
    out.push_str(&format!("Data: {}\n", config.data_path.display()));
    out.push_str(&format!(
        "Points: n={} | R=[{:.1}, {:.1}] ohm | T=[{:.2}, {:.2}] C\n",
        ingest.stats.n_points,
        ingest.stats.resistance_min,
        ingest.stats.resistance_max,
        ingest.stats.temperature_min,
        ingest.stats.temperature_max,
    ));
    if !ingest.row_errors.is_empty() {
        out.push_str(&format!(
            "Skipped rows: {} of {}\n",
            ingest.row_errors.len(),
            ingest.rows_read
        ));
    }
    out.push_str(&format!("R25: {} ohm\n", config.r25));

    out.push_str("\nCoefficients:\n");
    let values = result.params.to_array();
    for (name, v) in PARAM_NAMES.iter().zip(values.iter()) {
        out.push_str(&format!("  {name} = {v:.9e}\n"));
    }

    out.push_str(&format!("\nSSE: {:.6e} (threshold {})\n", result.sse, result.sse_threshold));
    out.push_str(&format!("RMSE: {:.4} C\n", result.rmse()));
    out.push_str(&result.verdict.message(result.sse_threshold));
    out.push('\n');

    for w in &result.warnings {
        out.push_str(&format!("WARNING: {w}\n"));
    }

    out
}

/// Format solver statistics and the covariance estimate.
pub fn format_diagnostics(result: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Solver iterations: {}\n", result.iterations));

    match (&result.covariance, result.standard_errors()) {
        (Some(cov), Some(se)) => {
            out.push_str("Standard errors:\n");
            for (name, s) in PARAM_NAMES.iter().zip(se.iter()) {
                out.push_str(&format!("  {name} ± {s:.3e}\n"));
            }
            out.push_str("Covariance:\n");
            for row in cov {
                let cells: Vec<String> = row.iter().map(|v| format!("{v:>11.3e}")).collect();
                out.push_str(&format!("  [{}]\n", cells.join(" ")));
            }
        }
        _ => out.push_str("Covariance: n/a\n"),
    }

    out
}

/// Format the per-point residual table ("Tdiffs").
pub fn format_residual_table(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>12} {:>10} {:>10} {:>10}\n",
            "R_ohm", "T_meas", "T_fit", "T_diff"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<10} {:-<10} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(&format!(
            "{:>12.1} {:>10.3} {:>10.3} {:>10.4}\n",
            r.point.resistance, r.point.temperature, r.t_fit, r.residual
        ));
    }

    out
}
