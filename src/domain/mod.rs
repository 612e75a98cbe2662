//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - calibration inputs (`CalibrationPoint`, `ModelParameters`)
//! - fit outputs (`Evaluation`, `FitResult`, `FitQuality`, `FitWarning`)
//! - run configuration and the saved fit file (`FitConfig`, `FitFile`)

pub mod types;

pub use types::*;
