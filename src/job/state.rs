// src/job/state.rs

//! Job lifecycle types: phase, progress and the terminal outcome.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{JobId, RenderParams};

/// Coarse lifecycle stage.
///
/// Legal transitions: `Queued -> Running -> {Succeeded | Failed}`, plus
/// `Queued -> Failed` for jobs the scheduler gives up on before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Queued => "queued",
            Phase::Running => "running",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Last progress snapshot of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// 0..=100; 100 only once the job has succeeded.
    pub percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_frame: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

impl Progress {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
            current_frame: None,
            total_frames: None,
            eta: None,
        }
    }

    pub fn pending() -> Self {
        Self::new(0, "Pending...")
    }
}

/// Distinguishes the ways a job can end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The renderer could not be started.
    Spawn,
    /// The renderer exited with a non-zero code (`None` when killed by a signal).
    ProcessFailure { exit_code: Option<i32> },
    /// The renderer exited 0 but left nothing in the output directory.
    NoArtifacts,
    /// Someone asked for the job to stop.
    Cancelled,
    /// The job never ran to completion because its worker went away.
    Lost,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Spawn => f.write_str("renderer could not be started"),
            FailureKind::ProcessFailure {
                exit_code: Some(code),
            } => write!(f, "renderer failed with code {code}"),
            FailureKind::ProcessFailure { exit_code: None } => {
                f.write_str("renderer was terminated by a signal")
            }
            FailureKind::NoArtifacts => f.write_str("renderer exited 0 but produced no artifacts"),
            FailureKind::Cancelled => f.write_str("render was cancelled"),
            FailureKind::Lost => f.write_str("render job was lost"),
        }
    }
}

/// Error detail attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    #[serde(flatten)]
    pub kind: FailureKind,
    /// Human-readable detail; for process failures this is the tail of the
    /// renderer's combined output.
    pub diagnostic: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        Self {
            kind,
            diagnostic: diagnostic.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.diagnostic.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.diagnostic)
        }
    }
}

/// Phase together with the data that only exists in that phase, so a
/// succeeded job without artifacts or a failed job without an error cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded { artifacts: Vec<String> },
    Failed { error: JobFailure },
}

impl JobState {
    pub fn phase(&self) -> Phase {
        match self {
            JobState::Queued => Phase::Queued,
            JobState::Running => Phase::Running,
            JobState::Succeeded { .. } => Phase::Succeeded,
            JobState::Failed { .. } => Phase::Failed,
        }
    }
}

/// Read-only, internally consistent copy of a job, safe to hand to status
/// pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub params: RenderParams,
    #[serde(flatten)]
    pub state: JobState,
    pub progress: Progress,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn artifacts(&self) -> Option<&[String]> {
        match &self.state {
            JobState::Succeeded { artifacts } => Some(artifacts),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&JobFailure> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }
}
