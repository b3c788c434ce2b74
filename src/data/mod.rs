//! Upstream data sources.

pub mod osha;

pub use osha::*;
