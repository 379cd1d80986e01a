//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums and structs (`Survey`, `Split`, `ExtractConfig`, ...)
//! - light-curve records and tables (`LightCurveRecord`, `LightCurveTable`)
//! - fit outputs (`BazinParams`)

pub mod record;
pub mod types;

pub use record::*;
pub use types::*;
