// src/store/mod.rs

//! Job State Store.
//!
//! Holds one record per job. The index (`JobId -> record`) sits behind a
//! single `RwLock` that is only write-locked to insert or evict a job; every
//! mutation of an existing job takes that job's own mutex, so workers
//! finalizing different jobs never contend with each other. Readers clone the
//! record under the same mutex and therefore always see a complete snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::job::{JobFailure, JobId, JobSnapshot, JobState, Phase, Progress, RenderParams};

/// Percent a running job may report; 100 is reserved for `Succeeded`.
const RUNNING_PERCENT_CAP: u8 = 99;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("illegal transition for job {job_id}: {from} -> {to}")]
    IllegalTransition { job_id: JobId, from: Phase, to: Phase },

    #[error("job {job_id} is {phase}; progress is only accepted while running")]
    NotRunning { job_id: JobId, phase: Phase },

    #[error("job {0} cannot succeed without artifacts")]
    EmptyArtifacts(JobId),
}

type Record = Arc<Mutex<JobSnapshot>>;

#[derive(Debug, Default)]
struct Index {
    records: HashMap<JobId, Record>,
    /// Submission order, for listing.
    order: Vec<JobId>,
}

/// Shared, concurrently readable job registry.
///
/// Create one per scheduler and pass it around behind an `Arc`; there is no
/// global instance.
#[derive(Debug, Default)]
pub struct JobStore {
    index: RwLock<Index>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted job in phase `Queued` with 0% progress.
    pub fn insert(
        &self,
        job_id: JobId,
        input: PathBuf,
        output_dir: PathBuf,
        params: RenderParams,
    ) -> JobSnapshot {
        let snapshot = JobSnapshot {
            job_id,
            input,
            output_dir,
            params,
            state: JobState::Queued,
            progress: Progress::pending(),
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };

        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        index
            .records
            .insert(job_id, Arc::new(Mutex::new(snapshot.clone())));
        index.order.push(job_id);
        debug!(job_id = %job_id, "job registered");

        snapshot
    }

    pub fn get(&self, job_id: &JobId) -> Option<JobSnapshot> {
        let record = self.record(job_id)?;
        let snapshot = lock(&record).clone();
        Some(snapshot)
    }

    /// All known jobs, in submission order.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let records: Vec<Record> = {
            let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
            index
                .order
                .iter()
                .filter_map(|id| index.records.get(id).cloned())
                .collect()
        };
        records.iter().map(|r| lock(r).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Queued -> Running`.
    pub fn mark_running(&self, job_id: &JobId) -> Result<(), StoreError> {
        self.with_record(job_id, |job| {
            expect_phase(job, Phase::Queued, Phase::Running)?;
            job.state = JobState::Running;
            job.progress = Progress::new(0, "Starting render...");
            job.started_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Replace the progress snapshot of a running job.
    pub fn update_progress(&self, job_id: &JobId, mut progress: Progress) -> Result<(), StoreError> {
        self.with_record(job_id, |job| {
            let phase = job.state.phase();
            if phase != Phase::Running {
                return Err(StoreError::NotRunning {
                    job_id: job.job_id,
                    phase,
                });
            }
            progress.percent = progress.percent.min(RUNNING_PERCENT_CAP);
            job.progress = progress;
            Ok(())
        })
    }

    /// `Running -> Succeeded`. The artifact list must be non-empty.
    pub fn succeed(&self, job_id: &JobId, artifacts: Vec<String>) -> Result<(), StoreError> {
        self.with_record(job_id, |job| {
            expect_phase(job, Phase::Running, Phase::Succeeded)?;
            if artifacts.is_empty() {
                return Err(StoreError::EmptyArtifacts(job.job_id));
            }
            job.state = JobState::Succeeded { artifacts };
            job.progress = Progress::new(100, "Render completed");
            job.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    /// `Running -> Failed`, or `Queued -> Failed` for jobs that never ran.
    pub fn fail(&self, job_id: &JobId, failure: JobFailure) -> Result<(), StoreError> {
        self.with_record(job_id, |job| {
            let from = job.state.phase();
            if from.is_terminal() {
                return Err(StoreError::IllegalTransition {
                    job_id: job.job_id,
                    from,
                    to: Phase::Failed,
                });
            }
            job.progress = Progress::new(job.progress.percent, failure.kind.to_string());
            job.state = JobState::Failed { error: failure };
            job.finished_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Drop a finished job from the store. Used by retention policies; jobs
    /// that are still queued or running are left alone.
    pub fn evict(&self, job_id: &JobId) -> Option<JobSnapshot> {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        let terminal = index
            .records
            .get(job_id)
            .map(|r| lock(r).state.phase().is_terminal())?;
        if !terminal {
            return None;
        }
        index.order.retain(|id| id != job_id);
        let record = index.records.remove(job_id)?;
        let snapshot = lock(&record).clone();
        Some(snapshot)
    }

    fn record(&self, job_id: &JobId) -> Option<Record> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(job_id)
            .cloned()
    }

    fn with_record<T>(
        &self,
        job_id: &JobId,
        f: impl FnOnce(&mut JobSnapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let record = self
            .record(job_id)
            .ok_or(StoreError::UnknownJob(*job_id))?;
        let mut job = lock(&record);
        f(&mut *job)
    }
}

fn lock(record: &Record) -> MutexGuard<'_, JobSnapshot> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

fn expect_phase(job: &JobSnapshot, expected: Phase, to: Phase) -> Result<(), StoreError> {
    let from = job.state.phase();
    if from != expected {
        return Err(StoreError::IllegalTransition {
            job_id: job.job_id,
            from,
            to,
        });
    }
    Ok(())
}
