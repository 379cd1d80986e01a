//! Input/output helpers.
//!
//! - raw survey CSV tables (`tables`)
//! - photometry slice → record (`records`)
//! - gzip JSON record collections (`store`)
//! - feature CSV export (`export`)

pub mod export;
pub mod records;
pub mod store;
pub mod tables;

pub use export::*;
pub use records::*;
pub use store::*;
pub use tables::*;
