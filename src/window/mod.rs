//! Date-range windowing.
//!
//! Splits the collection range into calendar windows small enough that each
//! API call stays under the response cap.

pub mod plan;

pub use plan::*;
