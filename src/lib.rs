//! `lc-features` library crate.
//!
//! The binary (`lcfeat`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the extractor can be embedded in other pipelines

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
