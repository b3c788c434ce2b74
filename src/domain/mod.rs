//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - query inputs (`QueryWindow`, `QueryFilter`, `FetchConfig`)
//! - fetched data (`IncidentRecord`, `WindowResult`)
//! - the well-known field names and output paths

pub mod types;

pub use types::*;
