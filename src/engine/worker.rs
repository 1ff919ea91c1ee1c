// src/engine/worker.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collect;
use crate::exec::{ProcessOutcome, RenderBackend, RenderJob};
use crate::job::{FailureKind, JobFailure, JobId};
use crate::progress::ProgressEvent;
use crate::store::{JobStore, StoreError};

use super::queue::{JobQueue, QueuedJob};

/// Cancellation handles for jobs that are queued or running.
pub(crate) type CancelTokens = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Progress events buffered between a render and the store.
const EVENT_BUFFER: usize = 64;

/// Shared state every worker needs.
pub(crate) struct WorkerContext {
    pub store: Arc<JobStore>,
    pub queue: Arc<JobQueue>,
    pub backend: Arc<dyn RenderBackend>,
    pub tokens: CancelTokens,
    pub queue_horizon: Duration,
}

/// Pull jobs until the queue closes.
///
/// Job failures are recorded on the job and never end the loop. Only a store
/// invariant violation does; it is returned so shutdown can surface it.
pub(crate) async fn run_worker(slot: usize, ctx: Arc<WorkerContext>) -> Result<(), StoreError> {
    debug!(slot, "render worker started");

    while let Some(queued) = ctx.queue.pop().await {
        let job_id = queued.job.job_id;
        if let Err(e) = process_job(&ctx, queued).await {
            error!(slot, job_id = %job_id, error = %e, "job store invariant violated; stopping worker");
            return Err(e);
        }
    }

    debug!(slot, "render worker exiting");
    Ok(())
}

async fn process_job(ctx: &WorkerContext, queued: QueuedJob) -> Result<(), StoreError> {
    let QueuedJob {
        job,
        cancel,
        enqueued_at,
    } = queued;
    let job_id = job.job_id;

    ctx.store.mark_running(&job_id)?;

    let waited = enqueued_at.elapsed();
    if waited > ctx.queue_horizon {
        warn!(
            job_id = %job_id,
            waited_secs = waited.as_secs(),
            horizon_secs = ctx.queue_horizon.as_secs(),
            "job waited past the queue horizon"
        );
    }

    let result = if cancel.is_cancelled() {
        info!(job_id = %job_id, "job cancelled while queued");
        collect::finalize(
            &job,
            ProcessOutcome::Cancelled {
                output: String::new(),
            },
        )
        .await
    } else {
        match render(ctx, &job, &cancel).await? {
            Some(outcome) => collect::finalize(&job, outcome).await,
            None => {
                collect::discard(&job).await;
                Err(JobFailure::new(
                    FailureKind::Lost,
                    "render task terminated unexpectedly",
                ))
            }
        }
    };

    ctx.tokens
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&job_id);

    match result {
        Ok(artifacts) => {
            info!(job_id = %job_id, count = artifacts.len(), "render succeeded");
            ctx.store.succeed(&job_id, artifacts)
        }
        Err(failure) => {
            info!(job_id = %job_id, kind = %failure.kind, "render failed");
            ctx.store.fail(&job_id, failure)
        }
    }
}

/// Run the backend on its own task and apply its events to the store in
/// emission order. `None` means the render task panicked.
async fn render(
    ctx: &WorkerContext,
    job: &RenderJob,
    cancel: &CancellationToken,
) -> Result<Option<ProcessOutcome>, StoreError> {
    let job_id = job.job_id;
    let (tx, mut rx) = mpsc::channel::<ProgressEvent>(EVENT_BUFFER);

    let backend = Arc::clone(&ctx.backend);
    let render_job = job.clone();
    let render_cancel = cancel.clone();
    let handle =
        tokio::spawn(async move { backend.render(render_job, tx, render_cancel).await });

    while let Some(event) = rx.recv().await {
        if let Err(e) = ctx.store.update_progress(&job_id, event.into_progress()) {
            // Stop the render and reap it before reporting.
            cancel.cancel();
            drop(rx);
            let _ = handle.await;
            return Err(e);
        }
    }

    match handle.await {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "render task failed");
            Ok(None)
        }
    }
}
