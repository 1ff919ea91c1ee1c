// src/collect/mod.rs

//! Result collection: turns a finished render attempt into either a list of
//! artifacts or a failure, and cleans up whatever the job no longer needs.
//!
//! Succeeded always implies at least one artifact on disk; failed jobs leave
//! nothing behind in their output directory.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::exec::{ProcessOutcome, RenderJob};
use crate::job::{FailureKind, JobFailure};

/// Finalize a render attempt.
///
/// On `Exited` the output directory is listed; an empty listing is a
/// `NoArtifacts` failure. Every failure path removes partial output. The
/// input scene file is released in all cases.
pub async fn finalize(job: &RenderJob, outcome: ProcessOutcome) -> Result<Vec<String>, JobFailure> {
    let result = match outcome {
        ProcessOutcome::Exited => match list_artifacts(&job.output_dir).await {
            Ok(artifacts) if !artifacts.is_empty() => Ok(artifacts),
            Ok(_) => Err(JobFailure::new(
                FailureKind::NoArtifacts,
                format!("no files found in {:?}", job.output_dir),
            )),
            Err(e) => Err(JobFailure::new(FailureKind::NoArtifacts, format!("{e:#}"))),
        },
        ProcessOutcome::Failed { exit_code, output } => Err(JobFailure::new(
            FailureKind::ProcessFailure { exit_code },
            output,
        )),
        ProcessOutcome::SpawnFailed(reason) => Err(JobFailure::new(FailureKind::Spawn, reason)),
        ProcessOutcome::Cancelled { output } => {
            Err(JobFailure::new(FailureKind::Cancelled, output))
        }
    };

    if let Err(failure) = &result {
        info!(job_id = %job.job_id, kind = %failure.kind, "discarding partial output");
        discard_outputs(&job.output_dir).await;
    }
    release_input(&job.input).await;

    result
}

/// Drop everything a job produced or owns. Used for jobs that fail without a
/// render attempt (lost on shutdown, crashed worker).
pub async fn discard(job: &RenderJob) {
    discard_outputs(&job.output_dir).await;
    release_input(&job.input).await;
}

/// Regular, non-hidden files in `dir`, sorted by name.
pub async fn list_artifacts(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("reading output directory {:?}", dir))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("listing output directory {:?}", dir))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("inspecting {:?}", entry.path()))?;
        if file_type.is_file() {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

async fn discard_outputs(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = ?dir, "removed output directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(dir = ?dir, error = %e, "failed to remove partial output"),
    }
}

async fn release_input(input: &Path) {
    match tokio::fs::remove_file(input).await {
        Ok(()) => debug!(input = ?input, "removed input scene file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(input = ?input, error = %e, "failed to remove input scene file"),
    }
}
