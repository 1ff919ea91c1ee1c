// src/engine/scheduler.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collect;
use crate::config::ConfigFile;
use crate::errors::{RenderqError, Result};
use crate::exec::{ProcessSupervisor, RenderBackend, RenderJob};
use crate::job::{FailureKind, JobFailure, JobId, JobSnapshot, Phase, RenderDefaults, RenderRequest};
use crate::store::{JobStore, StoreError};

use super::queue::{JobQueue, QueuedJob};
use super::worker::{CancelTokens, WorkerContext, run_worker};

/// Knobs the scheduler needs, independent of the TOML layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub render_slots: usize,
    pub queue_horizon: Duration,
    pub output_root: PathBuf,
    pub defaults: RenderDefaults,
}

impl SchedulerSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            render_slots: cfg.render_slots,
            queue_horizon: cfg.queue_horizon,
            output_root: cfg.output_root.clone(),
            defaults: cfg.render_defaults(),
        }
    }
}

/// Accepts render jobs and runs them on a fixed pool of workers.
///
/// Submission and status queries never wait on a render; workers own their
/// jobs for the whole Running phase.
pub struct Scheduler {
    settings: SchedulerSettings,
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    tokens: CancelTokens,
    workers: Mutex<Vec<JoinHandle<std::result::Result<(), StoreError>>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("settings", &self.settings)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Spawn `render_slots` workers on the current tokio runtime.
    pub fn start(settings: SchedulerSettings, backend: Arc<dyn RenderBackend>) -> Self {
        let store = Arc::new(JobStore::new());
        let queue = Arc::new(JobQueue::new());
        let tokens: CancelTokens = Arc::new(Mutex::new(HashMap::new()));

        let ctx = Arc::new(WorkerContext {
            store: Arc::clone(&store),
            queue: Arc::clone(&queue),
            backend,
            tokens: Arc::clone(&tokens),
            queue_horizon: settings.queue_horizon,
        });

        let slots = settings.render_slots.max(1);
        let workers = (0..slots)
            .map(|slot| tokio::spawn(run_worker(slot, Arc::clone(&ctx))))
            .collect();

        info!(
            render_slots = slots,
            output_root = ?settings.output_root,
            "scheduler started"
        );

        Self {
            settings,
            store,
            queue,
            tokens,
            workers: Mutex::new(workers),
        }
    }

    /// Start a scheduler that renders with the real external process.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let backend: Arc<dyn RenderBackend> = Arc::new(ProcessSupervisor::from_config(cfg));
        Self::start(SchedulerSettings::from_config(cfg), backend)
    }

    /// Validate and enqueue a job. Invalid requests are rejected here and
    /// never reach the queue.
    pub fn submit(&self, request: RenderRequest) -> Result<JobId> {
        if self.queue.is_closed() {
            return Err(RenderqError::ShuttingDown);
        }
        let (input, params) = request.validate(&self.settings.defaults)?;

        let job_id = JobId::new();
        let output_dir = self.settings.output_root.join(job_id.to_string());
        let cancel = CancellationToken::new();

        self.store
            .insert(job_id, input.clone(), output_dir.clone(), params.clone());
        self.tokens_lock().insert(job_id, cancel.clone());

        let job = RenderJob {
            job_id,
            input,
            output_dir,
            params,
        };
        if self.queue.push(QueuedJob::new(job, cancel)).is_err() {
            // Raced with shutdown after the check above.
            self.tokens_lock().remove(&job_id);
            self.store.fail(
                &job_id,
                JobFailure::new(FailureKind::Lost, "scheduler shut down before the job ran"),
            )?;
            return Err(RenderqError::ShuttingDown);
        }

        info!(job_id = %job_id, "job queued");
        Ok(job_id)
    }

    /// Consistent snapshot of one job.
    pub fn status(&self, job_id: &JobId) -> Result<JobSnapshot> {
        self.store
            .get(job_id)
            .ok_or(RenderqError::JobNotFound(*job_id))
    }

    /// Full paths of a succeeded job's artifacts, in name order.
    pub fn artifacts(&self, job_id: &JobId) -> Result<Vec<PathBuf>> {
        let snapshot = self.status(job_id)?;
        match snapshot.artifacts() {
            Some(names) => Ok(names
                .iter()
                .map(|name| snapshot.output_dir.join(name))
                .collect()),
            None => Err(RenderqError::ArtifactsUnavailable {
                job_id: *job_id,
                phase: snapshot.phase(),
            }),
        }
    }

    /// Request cancellation. Returns `false` when the job has already
    /// finished. The job reaches Failed only after its worker has stopped
    /// the render, so callers should keep polling `status`.
    pub fn cancel(&self, job_id: &JobId) -> Result<bool> {
        let snapshot = self.status(job_id)?;
        if snapshot.phase().is_terminal() {
            return Ok(false);
        }
        match self.tokens_lock().get(job_id) {
            Some(token) => {
                info!(job_id = %job_id, phase = %snapshot.phase(), "cancellation requested");
                token.cancel();
                Ok(true)
            }
            // The worker finalized the job between the two lookups.
            None => Ok(false),
        }
    }

    /// Every known job, oldest submission first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        self.store.list()
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Stop accepting jobs, fail everything still queued as lost, cancel
    /// running renders and wait for the workers to finish.
    ///
    /// Returns the first invariant violation any worker hit.
    pub async fn shutdown(&self) -> Result<()> {
        info!("scheduler shutting down");
        self.queue.close();

        let mut first_error: Option<StoreError> = None;

        for queued in self.queue.drain() {
            let job_id = queued.job.job_id;
            self.tokens_lock().remove(&job_id);
            collect::discard(&queued.job).await;
            warn!(job_id = %job_id, "queued job lost at shutdown");
            if let Err(e) = self.store.fail(
                &job_id,
                JobFailure::new(FailureKind::Lost, "scheduler shut down before the job ran"),
            ) {
                first_error.get_or_insert(e);
            }
        }

        for token in self.tokens_lock().values() {
            token.cancel();
        }

        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in workers {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "render worker panicked"),
            }
        }

        let running: Vec<JobId> = self
            .store
            .list()
            .into_iter()
            .filter(|job| job.phase() == Phase::Running)
            .map(|job| job.job_id)
            .collect();
        for job_id in running {
            // Only reachable if a worker stopped early.
            warn!(job_id = %job_id, "job left running at shutdown");
            if let Err(e) = self.store.fail(
                &job_id,
                JobFailure::new(FailureKind::Lost, "worker stopped before the job finished"),
            ) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(RenderqError::Invariant(e)),
            None => {
                info!("scheduler stopped");
                Ok(())
            }
        }
    }

    fn tokens_lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, CancellationToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
