//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit the four Steinhart-Hart coefficients by nonlinear least squares (`fitter`)
//! - compute residuals, SSE and the quality verdict (`evaluate`)
//! - run both as one configurable calibration step (`calibrate`)

pub mod calibrate;
pub mod evaluate;
pub mod fitter;

pub use calibrate::*;
pub use evaluate::*;
pub use fitter::*;
