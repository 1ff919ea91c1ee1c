// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::job::{JobId, Phase, ValidationError};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum RenderqError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Invalid render request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Artifacts for job {job_id} are unavailable in phase {phase}")]
    ArtifactsUnavailable { job_id: JobId, phase: Phase },

    #[error("Scheduler is shutting down; no new jobs are accepted")]
    ShuttingDown,

    #[error("Job store invariant violated: {0}")]
    Invariant(#[from] StoreError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RenderqError>;
