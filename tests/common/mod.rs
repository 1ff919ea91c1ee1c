#![allow(dead_code)]

use std::time::Duration;

use renderq::engine::Scheduler;
use renderq::job::{JobId, JobSnapshot};

pub use renderq_test_utils::{init_tracing, with_timeout};

/// Poll `status` until the job reaches a terminal phase.
pub async fn wait_terminal(scheduler: &Scheduler, job_id: &JobId) -> JobSnapshot {
    loop {
        let snapshot = scheduler.status(job_id).expect("job should exist");
        if snapshot.phase().is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the job has left the queue.
pub async fn wait_running(scheduler: &Scheduler, job_id: &JobId) -> JobSnapshot {
    loop {
        let snapshot = scheduler.status(job_id).expect("job should exist");
        if snapshot.phase() != renderq::job::Phase::Queued {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
