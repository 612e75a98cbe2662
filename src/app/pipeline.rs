//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place keeps the workflow
//! CSV ingest -> fit -> evaluate
//! independent of presentation (printing, plotting, exports).

use crate::domain::FitConfig;
use crate::error::AppError;
use crate::fit::{CurveFitter, FitterOptions};
use crate::io::ingest::{IngestedData, load_calibration_points};
use crate::math::SolveOptions;

/// All computed outputs of a single `shfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub result: crate::domain::FitResult,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_calibration_points(&config.data_path)?;
    run_fit_with_data(config, ingest)
}

/// Execute the fitting pipeline on already-loaded data.
pub fn run_fit_with_data(config: &FitConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let fitter = CurveFitter::new(fitter_options(config));
    let result = fitter.run(&ingest.points, config.initial_guess, config.r25)?;

    Ok(RunOutput { ingest, result })
}

pub fn fitter_options(config: &FitConfig) -> FitterOptions {
    FitterOptions {
        include_diagnostic_output: config.include_diagnostic_output,
        plot: config.plot,
        sse_threshold: config.sse_threshold,
        solver: SolveOptions {
            max_iters: config.max_iters,
            ..SolveOptions::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_R25, FitQuality, ModelParameters};
    use crate::io::ingest::read_calibration_points;
    use std::path::PathBuf;

    fn config() -> FitConfig {
        FitConfig {
            data_path: PathBuf::from("unused.csv"),
            r25: DEFAULT_R25,
            initial_guess: ModelParameters::NOMINAL,
            sse_threshold: 0.02,
            max_iters: 200,
            include_diagnostic_output: true,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_fit: None,
        }
    }

    #[test]
    fn fits_csv_data_end_to_end() {
        // Nominal-coefficient temperatures, rounded to 1 mK.
        let csv = "T,R\n\
                   -3.633,32000\n\
                   7.389,20000\n\
                   19.141,12500\n\
                   25.0,10000\n\
                   31.052,8000\n\
                   42.76,5300\n\
                   54.454,3600\n\
                   66.162,2500\n";
        let ingest = read_calibration_points(csv.as_bytes()).unwrap();
        let run = run_fit_with_data(&config(), ingest).unwrap();

        assert_eq!(run.result.residuals.len(), 8);
        assert!(run.result.params.is_finite());
        assert_eq!(run.result.verdict, FitQuality::Acceptable);
        assert!(run.result.warnings.is_empty(), "{:?}", run.result.warnings);
    }

    #[test]
    fn insufficient_rows_map_to_exit_code_3() {
        let csv = "T,R\n25,10000\n30,8000\n";
        let ingest = read_calibration_points(csv.as_bytes()).unwrap();
        let err = run_fit_with_data(&config(), ingest).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
