// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the renderer, using
//! `tokio::process::Command`, and reporting progress back to the worker that
//! owns the job.
//!
//! - [`command`] builds the renderer command line from a job.
//! - [`supervisor`] owns one renderer process: spawn, merged output
//!   streaming, progress parsing, cancellation, exit classification.
//! - [`log_tail`] bounds the output kept for failure diagnostics.
//! - [`backend`] provides the `RenderBackend` trait that workers use, and
//!   which tests can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod log_tail;
pub mod supervisor;

pub use backend::{ProcessOutcome, RenderBackend, RenderJob};
pub use command::{RenderCommand, output_template};
pub use log_tail::LogTail;
pub use supervisor::ProcessSupervisor;
