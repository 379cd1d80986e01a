//! Bazin fitting and feature assembly.
//!
//! - `fitter`: one band → parameters or a zero fallback
//! - `extractor`: all bands of all objects → feature matrix
//! - `quality`: optional signal-to-noise cut applied before fitting

pub mod extractor;
pub mod fitter;
pub mod quality;

pub use extractor::*;
pub use fitter::*;
pub use quality::*;
