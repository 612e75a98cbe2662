//! `sh-fit` library crate.
//!
//! The binary (`shfit`) is a thin wrapper around this library so that:
//!
//! - the Steinhart-Hart fit is testable without spawning processes
//! - the solver and model can be reused outside the CLI
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
