// src/job/mod.rs

//! Job identity, parameters and lifecycle data.
//!
//! - [`params`] holds the submission request, its validation, and the
//!   resolved [`RenderParams`].
//! - [`state`] holds [`Phase`], [`Progress`], and the tagged [`JobState`]
//!   that only allows well-formed terminal results.

pub mod params;
pub mod state;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

pub use params::{FrameRange, RenderDefaults, RenderParams, RenderRequest, ValidationError};
pub use state::{FailureKind, JobFailure, JobSnapshot, JobState, Phase, Progress};

/// Opaque, unique job identifier assigned at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(JobId)
    }
}
