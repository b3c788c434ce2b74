//! Input/output helpers.
//!
//! - raw JSON archive per window (`raw`)
//! - record flattening + date normalization (`flatten`)
//! - combined CSV export (`export`)

pub mod export;
pub mod flatten;
pub mod raw;

pub use export::*;
pub use flatten::*;
pub use raw::*;
