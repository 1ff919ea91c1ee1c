// src/engine/mod.rs

//! Orchestration engine for renderq.
//!
//! This module ties together:
//! - the FIFO job queue shared by all workers
//! - the worker loop that drives one job at a time through the render
//!   backend, the job store and result collection
//! - the `Scheduler` facade used by callers to submit, query and cancel jobs

pub mod queue;
pub mod scheduler;
mod worker;

pub use queue::{JobQueue, QueuedJob};
pub use scheduler::{Scheduler, SchedulerSettings};
