// src/job/params.rs

//! Submission parameters and their synchronous validation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::OutputFormat;

/// Why a submission was rejected before it ever reached the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no input scene file given")]
    MissingInput,

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: i64 },

    #[error("{field} is out of range (got {value})")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("frame_start and frame_end must be given together")]
    PartialFrameRange,

    #[error("frame_end ({end}) is before frame_start ({start})")]
    InvertedFrameRange { start: i64, end: i64 },
}

/// A render request as handed over by the upload/extraction collaborator.
///
/// Everything except the input path is optional; missing values are filled
/// from [`RenderDefaults`] during validation.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub input: PathBuf,
    pub format: Option<String>,
    pub samples: Option<i64>,
    pub resolution_x: Option<i64>,
    pub resolution_y: Option<i64>,
    pub frame_start: Option<i64>,
    pub frame_end: Option<i64>,
    pub gpu: Option<bool>,
}

impl RenderRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Check the request and resolve defaults into concrete parameters.
    pub fn validate(
        self,
        defaults: &RenderDefaults,
    ) -> Result<(PathBuf, RenderParams), ValidationError> {
        if self.input.as_os_str().is_empty() {
            return Err(ValidationError::MissingInput);
        }

        let format = match self.format.as_deref() {
            Some(s) => s
                .parse::<OutputFormat>()
                .map_err(ValidationError::UnsupportedFormat)?,
            None => defaults.format,
        };

        let samples = positive("samples", self.samples, defaults.samples)?;
        let resolution_x = positive("resolution_x", self.resolution_x, defaults.resolution_x)?;
        let resolution_y = positive("resolution_y", self.resolution_y, defaults.resolution_y)?;

        let frame_range = match (self.frame_start, self.frame_end) {
            (None, None) => None,
            (Some(start), Some(end)) => {
                let start = frame_number("frame_start", start)?;
                let end = frame_number("frame_end", end)?;
                if end < start {
                    return Err(ValidationError::InvertedFrameRange { start, end });
                }
                Some(FrameRange { start, end })
            }
            _ => return Err(ValidationError::PartialFrameRange),
        };

        let params = RenderParams {
            format,
            samples,
            resolution_x,
            resolution_y,
            frame_range,
            gpu: self.gpu.unwrap_or(defaults.use_gpu),
        };

        Ok((self.input, params))
    }
}

fn positive(field: &'static str, value: Option<i64>, default: u32) -> Result<u32, ValidationError> {
    let Some(value) = value else {
        return Ok(default);
    };
    if value <= 0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange { field, value })
}

/// Frame numbers must fit the renderer's 32-bit frame counter.
fn frame_number(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    i32::try_from(value)
        .map(i64::from)
        .map_err(|_| ValidationError::OutOfRange { field, value })
}

/// Values used for fields a request leaves unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDefaults {
    pub format: OutputFormat,
    pub samples: u32,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub use_gpu: bool,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            samples: 128,
            resolution_x: 1920,
            resolution_y: 1080,
            use_gpu: true,
        }
    }
}

/// Inclusive animation frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
}

impl FrameRange {
    /// Number of frames in the range, at least 1 for a validated range.
    pub fn total_frames(&self) -> u64 {
        self.end.abs_diff(self.start).saturating_add(1)
    }
}

/// Validated, fully resolved render parameters. Immutable once a job exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderParams {
    pub format: OutputFormat,
    pub samples: u32,
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub frame_range: Option<FrameRange>,
    pub gpu: bool,
}

impl RenderParams {
    /// Animation jobs that write one file per frame.
    pub fn is_image_sequence(&self) -> bool {
        self.frame_range.is_some() && !self.format.is_video()
    }
}
