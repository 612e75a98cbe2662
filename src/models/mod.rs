//! Thermistor model implementations.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic.

pub mod steinhart_hart;

pub use steinhart_hart::*;
