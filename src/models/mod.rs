//! Parametric light-curve models.
//!
//! Models are implemented as small, pure functions so that the solver code can
//! stay generic.

pub mod bazin;

pub use bazin::*;
