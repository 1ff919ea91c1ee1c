// src/progress/mod.rs

//! Progress extraction from renderer output.
//!
//! The renderer reports nothing structured; [`parser`] adapts its free-text
//! log markers (`Fra:`, `Saved:`, `Sample a/b`) into typed
//! [`ProgressEvent`]s. [`eta`] holds the remaining-time projection used for
//! frame-range jobs.

pub mod eta;
pub mod parser;

pub use eta::{estimate_eta, format_eta};
pub use parser::{ProgressEvent, ProgressParser};
