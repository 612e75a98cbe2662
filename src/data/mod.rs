//! Synthetic calibration data.

pub mod sample;

pub use sample::*;
