//! Data sources: serialized datasets, the public data host, and synthetic samples.

pub mod download;
pub mod loader;
pub mod sample;

pub use download::*;
pub use loader::*;
pub use sample::*;
