// tests/job_store.rs

use std::path::PathBuf;
use std::sync::Arc;

use renderq::job::{FailureKind, JobFailure, JobId, JobState, Phase, Progress, RenderParams};
use renderq::store::{JobStore, StoreError};
use renderq::types::OutputFormat;

fn params() -> RenderParams {
    RenderParams {
        format: OutputFormat::Png,
        samples: 128,
        resolution_x: 1920,
        resolution_y: 1080,
        frame_range: None,
        gpu: false,
    }
}

fn queued_job(store: &JobStore) -> JobId {
    let job_id = JobId::new();
    store.insert(
        job_id,
        PathBuf::from("/tmp/scene.blend"),
        PathBuf::from(format!("/tmp/out/{job_id}")),
        params(),
    );
    job_id
}

#[test]
fn inserted_job_is_queued_at_zero_percent() {
    let store = JobStore::new();
    let job_id = queued_job(&store);

    let snapshot = store.get(&job_id).unwrap();
    assert_eq!(snapshot.phase(), Phase::Queued);
    assert_eq!(snapshot.progress.percent, 0);
    assert_eq!(snapshot.progress.message, "Pending...");
    assert!(snapshot.started_at.is_none());
    assert!(snapshot.artifacts().is_none());
}

#[test]
fn full_success_lifecycle() {
    let store = JobStore::new();
    let job_id = queued_job(&store);

    store.mark_running(&job_id).unwrap();
    let running = store.get(&job_id).unwrap();
    assert_eq!(running.phase(), Phase::Running);
    assert_eq!(running.progress.message, "Starting render...");
    assert!(running.started_at.is_some());

    store
        .update_progress(&job_id, Progress::new(45, "Sampling 64/128"))
        .unwrap();
    assert_eq!(store.get(&job_id).unwrap().progress.percent, 45);

    store
        .succeed(&job_id, vec!["render.png".to_string()])
        .unwrap();
    let done = store.get(&job_id).unwrap();
    assert_eq!(done.phase(), Phase::Succeeded);
    assert_eq!(done.progress.percent, 100);
    assert_eq!(done.artifacts(), Some(&["render.png".to_string()][..]));
    assert!(done.finished_at.is_some());
}

#[test]
fn running_progress_never_reaches_one_hundred() {
    let store = JobStore::new();
    let job_id = queued_job(&store);
    store.mark_running(&job_id).unwrap();

    store
        .update_progress(&job_id, Progress::new(100, "almost"))
        .unwrap();
    assert_eq!(store.get(&job_id).unwrap().progress.percent, 99);
}

#[test]
fn progress_is_rejected_unless_running() {
    let store = JobStore::new();
    let job_id = queued_job(&store);

    let err = store
        .update_progress(&job_id, Progress::new(10, "early"))
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::NotRunning {
            job_id,
            phase: Phase::Queued
        }
    );
}

#[test]
fn terminal_phases_are_immutable() {
    let store = JobStore::new();
    let job_id = queued_job(&store);
    store.mark_running(&job_id).unwrap();
    store
        .fail(&job_id, JobFailure::new(FailureKind::Cancelled, ""))
        .unwrap();

    assert!(matches!(
        store.succeed(&job_id, vec!["x.png".into()]),
        Err(StoreError::IllegalTransition { from: Phase::Failed, .. })
    ));
    assert!(matches!(
        store.fail(&job_id, JobFailure::new(FailureKind::Lost, "")),
        Err(StoreError::IllegalTransition { .. })
    ));
    assert!(matches!(
        store.mark_running(&job_id),
        Err(StoreError::IllegalTransition { .. })
    ));
    assert!(store.update_progress(&job_id, Progress::new(1, "x")).is_err());

    let snapshot = store.get(&job_id).unwrap();
    assert_eq!(
        snapshot.error().map(|e| e.kind),
        Some(FailureKind::Cancelled)
    );
}

#[test]
fn success_requires_running_and_artifacts() {
    let store = JobStore::new();
    let job_id = queued_job(&store);

    assert!(matches!(
        store.succeed(&job_id, vec!["a.png".into()]),
        Err(StoreError::IllegalTransition { from: Phase::Queued, .. })
    ));

    store.mark_running(&job_id).unwrap();
    assert_eq!(
        store.succeed(&job_id, Vec::new()),
        Err(StoreError::EmptyArtifacts(job_id))
    );
    assert_eq!(store.get(&job_id).unwrap().phase(), Phase::Running);
}

#[test]
fn failure_keeps_last_percent_and_reports_kind() {
    let store = JobStore::new();
    let job_id = queued_job(&store);
    store.mark_running(&job_id).unwrap();
    store
        .update_progress(&job_id, Progress::new(30, "Rendering frame 3/10"))
        .unwrap();

    store
        .fail(
            &job_id,
            JobFailure::new(FailureKind::ProcessFailure { exit_code: Some(1) }, "boom"),
        )
        .unwrap();

    let snapshot = store.get(&job_id).unwrap();
    assert_eq!(snapshot.progress.percent, 30);
    assert_eq!(snapshot.progress.message, "renderer failed with code 1");
    match snapshot.state {
        JobState::Failed { error } => assert_eq!(error.diagnostic, "boom"),
        other => panic!("expected failed, got {other:?}"),
    }
}

#[test]
fn unknown_jobs_are_reported() {
    let store = JobStore::new();
    let missing = JobId::new();
    assert!(store.get(&missing).is_none());
    assert_eq!(
        store.mark_running(&missing),
        Err(StoreError::UnknownJob(missing))
    );
}

#[test]
fn list_preserves_submission_order_and_evict_only_drops_finished_jobs() {
    let store = JobStore::new();
    let ids: Vec<JobId> = (0..4).map(|_| queued_job(&store)).collect();

    let listed: Vec<JobId> = store.list().into_iter().map(|j| j.job_id).collect();
    assert_eq!(listed, ids);

    assert!(store.evict(&ids[1]).is_none());
    store.mark_running(&ids[1]).unwrap();
    store
        .fail(&ids[1], JobFailure::new(FailureKind::Spawn, "missing"))
        .unwrap();
    assert!(store.evict(&ids[1]).is_some());

    assert_eq!(store.len(), 3);
    let listed: Vec<JobId> = store.list().into_iter().map(|j| j.job_id).collect();
    assert_eq!(listed, vec![ids[0], ids[2], ids[3]]);
}

#[test]
fn status_reads_are_idempotent() {
    let store = JobStore::new();
    let job_id = queued_job(&store);
    store.mark_running(&job_id).unwrap();
    store
        .update_progress(&job_id, Progress::new(12, "Sampling 16/128"))
        .unwrap();

    let first = store.get(&job_id).unwrap();
    let second = store.get(&job_id).unwrap();
    assert_eq!(first, second);
}

#[test]
fn concurrent_readers_see_whole_snapshots() {
    let store = Arc::new(JobStore::new());
    let job_id = queued_job(&store);
    store.mark_running(&job_id).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 0..500u32 {
                let pct = (i % 90) as u8;
                store
                    .update_progress(&job_id, Progress::new(pct, format!("step {pct}")))
                    .unwrap();
            }
        })
    };

    for _ in 0..500 {
        let snapshot = store.get(&job_id).unwrap();
        if snapshot.progress.message != "Starting render..." {
            assert_eq!(
                snapshot.progress.message,
                format!("step {}", snapshot.progress.percent)
            );
        }
    }
    writer.join().unwrap();
}
