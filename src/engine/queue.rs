// src/engine/queue.rs

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::exec::RenderJob;

/// A job waiting for a render slot.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job: RenderJob,
    pub cancel: CancellationToken,
    pub enqueued_at: Instant,
}

impl QueuedJob {
    pub fn new(job: RenderJob, cancel: CancellationToken) -> Self {
        Self {
            job,
            cancel,
            enqueued_at: Instant::now(),
        }
    }
}

/// FIFO of submitted jobs shared by all workers.
///
/// Jobs come out in exactly the order they were pushed. There is no priority
/// and no reordering, so every job is eventually served. The closed flag
/// lives under the same lock as the jobs: once [`JobQueue::close`] returns,
/// no push can succeed and [`JobQueue::drain`] sees every accepted job.
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<QueuedJob>,
    closed: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. Hands the job back if the queue has been closed.
    pub fn push(&self, queued: QueuedJob) -> Result<(), QueuedJob> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(queued);
            }
            state.jobs.push_back(queued);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Wait for the next job. Returns `None` once the queue is closed; jobs
    /// still queued at that point are left for [`JobQueue::drain`].
    pub async fn pop(&self) -> Option<QueuedJob> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // await is not missed.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(queued) = state.jobs.pop_front() {
                    return Some(queued);
                }
            }

            notified.await;
        }
    }

    /// Stop handing out jobs and wake every waiting worker.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Remove and return everything still queued, oldest first.
    pub fn drain(&self) -> Vec<QueuedJob> {
        self.lock().jobs.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
