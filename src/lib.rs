//! `osha-disasters` library crate.
//!
//! The binary is a thin wrapper around this library so that:
//!
//! - the pipeline is testable against a fake source, without network access
//! - windowing, flattening and export can be reused by other front-ends

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod window;
