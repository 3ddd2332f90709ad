//! Progress reporting and size formatting.

pub mod progress;
