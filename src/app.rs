//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads calibration data and runs the fit
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs, SampleArgs};
use crate::data::{SampleConfig, generate_sample};
use crate::domain::FitConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `shfit` binary.
pub fn run() -> Result<(), AppError> {
    // `shfit` and `shfit --data x.csv` behave like `shfit fit ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.result, &config)
    );

    if config.include_diagnostic_output {
        let rows = crate::report::pair_residuals(&run.ingest.points, &run.result);
        println!("{}", crate::report::format_residual_table(&rows));
        println!("{}", crate::report::format_diagnostics(&run.result));
    }

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.ingest.points,
            &run.result.params,
            config.r25,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.result)?;
    }
    if let Some(path) = &config.export_fit {
        crate::io::fit_file::write_fit_json(path, &run.result, &run.ingest.points, config.r25)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit = crate::io::fit_file::read_fit_json(&args.fit)?;
    let plot = crate::plot::render_ascii_plot_from_fit_file(&fit, args.width, args.height);

    println!("{plot}");
    println!(
        "SSE: {:.6e} | {}",
        fit.sse,
        fit.verdict.message(fit.sse_threshold)
    );
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        count: args.count,
        r_min: args.r_min,
        r_max: args.r_max,
        r25: args.r25,
        params: args.coefficients(),
        noise_sigma: args.noise,
        seed: args.seed,
    };
    let points = generate_sample(&config)?;
    crate::io::export::write_calibration_csv(&args.output, &points)?;
    println!("Wrote {} points to {}", points.len(), args.output.display());
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.clone(),
        r25: args.r25,
        initial_guess: args.initial_guess(),
        sse_threshold: args.sse_threshold,
        max_iters: args.max_iters,
        include_diagnostic_output: args.diagnostics,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: (!args.no_export).then(|| args.export.clone()),
        export_fit: args.export_fit.clone(),
    }
}

/// Rewrite argv so `shfit` defaults to `shfit fit`.
///
/// Rules:
/// - `shfit`                      -> `shfit fit`
/// - `shfit --data x.csv ...`     -> `shfit fit --data x.csv ...`
/// - `shfit --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "plot" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "fit flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    argv
}
