//! Command-line parsing for the Steinhart-Hart calibration fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.
//!
//! A few flags can also come from the environment (`SHFIT_*`, optionally via a
//! `.env` file loaded at startup).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_R25, DEFAULT_SSE_THRESHOLD, ModelParameters};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "shfit", version, about = "4-parameter Steinhart-Hart thermistor calibration fit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the coefficients to a calibration CSV, report, plot and export.
    Fit(FitArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Write a synthetic calibration CSV generated from known coefficients.
    Sample(SampleArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Calibration CSV (header row, then `temperature_c,resistance_ohm` rows).
    #[arg(short = 'd', long, env = "SHFIT_DATA", default_value = "data.csv")]
    pub data: PathBuf,

    /// Reference resistance at 25°C (ohms).
    #[arg(long, env = "SHFIT_R25", default_value_t = DEFAULT_R25)]
    pub r25: f64,

    /// Initial coefficient guess `a0 a1 a2 a3` (defaults to nominal 10k NTC values).
    #[arg(long, num_args = 4, value_names = ["A0", "A1", "A2", "A3"], allow_hyphen_values = true)]
    pub guess: Option<Vec<f64>>,

    /// SSE above which the fit is reported as suspect (°C²).
    #[arg(long, env = "SHFIT_SSE_THRESHOLD", default_value_t = DEFAULT_SSE_THRESHOLD)]
    pub sse_threshold: f64,

    /// Solver iteration budget.
    #[arg(long, default_value_t = 200)]
    pub max_iters: usize,

    /// Print residuals per point, covariance and solver statistics.
    #[arg(short = 'v', long)]
    pub diagnostics: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Results CSV (coefficients, SSE, residuals, verdict).
    #[arg(long, default_value = "output.csv")]
    pub export: PathBuf,

    /// Do not write the results CSV.
    #[arg(long)]
    pub no_export: bool,

    /// Also export the fit (coefficients + data + curve grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,
}

impl FitArgs {
    pub fn initial_guess(&self) -> ModelParameters {
        match self.guess.as_deref() {
            Some([a0, a1, a2, a3]) => ModelParameters::new(*a0, *a1, *a2, *a3),
            _ => ModelParameters::NOMINAL,
        }
    }
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `shfit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, default_value = "data.csv")]
    pub output: PathBuf,

    /// Number of points.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,

    /// Smallest resistance (ohms).
    #[arg(long, default_value_t = 475.0)]
    pub r_min: f64,

    /// Largest resistance (ohms).
    #[arg(long, default_value_t = 23_000.0)]
    pub r_max: f64,

    /// Reference resistance at 25°C (ohms).
    #[arg(long, env = "SHFIT_R25", default_value_t = DEFAULT_R25)]
    pub r25: f64,

    /// Coefficients `a0 a1 a2 a3` to generate from (defaults to nominal values).
    #[arg(long, num_args = 4, value_names = ["A0", "A1", "A2", "A3"], allow_hyphen_values = true)]
    pub coeffs: Option<Vec<f64>>,

    /// Gaussian temperature noise (°C, one sigma).
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl SampleArgs {
    pub fn coefficients(&self) -> ModelParameters {
        match self.coeffs.as_deref() {
            Some([a0, a1, a2, a3]) => ModelParameters::new(*a0, *a1, *a2, *a3),
            _ => ModelParameters::NOMINAL,
        }
    }
}
