// src/exec/backend.rs

//! Pluggable render backend abstraction.
//!
//! Workers talk to a `RenderBackend` instead of spawning processes
//! themselves. Production uses [`ProcessSupervisor`](super::ProcessSupervisor),
//! which runs the external renderer; tests can provide a backend that writes
//! files and emits progress without any process at all.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::job::{JobId, RenderParams};
use crate::progress::ProgressEvent;

/// Everything a backend needs to render one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub job_id: JobId,
    /// Prepared scene file. Owned by the job until it is finalized.
    pub input: PathBuf,
    /// Directory the renderer writes artifacts into.
    pub output_dir: PathBuf,
    pub params: RenderParams,
}

/// How a render attempt ended, before artifacts are inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The renderer exited with code 0.
    Exited,
    /// Non-zero exit (or death by signal, `exit_code = None`).
    Failed {
        exit_code: Option<i32>,
        /// Bounded tail of the combined output.
        output: String,
    },
    /// The renderer never started.
    SpawnFailed(String),
    /// The render was stopped on request and the process reaped.
    Cancelled { output: String },
}

/// Trait abstracting how a job's render is carried out.
pub trait RenderBackend: Send + Sync {
    /// Run the render for `job` to completion.
    ///
    /// Implementations send progress events on `events` in the order they
    /// are observed, watch `cancel`, and must not return while a process they
    /// started is still alive.
    fn render(
        &self,
        job: RenderJob,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ProcessOutcome> + Send + '_>>;
}
