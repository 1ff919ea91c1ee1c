// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format requested for a render.
///
/// The variants map 1:1 onto the format tokens the driver script expects on
/// the renderer command line (`PNG`, `JPEG`, `OPEN_EXR`, `FFMPEG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Png,
    Jpeg,
    OpenExr,
    /// Encoded video (H.264 in an MP4 container).
    Ffmpeg,
}

impl OutputFormat {
    /// Token passed after `--format` to the driver script.
    pub fn token(self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::OpenExr => "OPEN_EXR",
            OutputFormat::Ffmpeg => "FFMPEG",
        }
    }

    /// File extension of the artifacts the renderer writes.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::OpenExr => "exr",
            OutputFormat::Ffmpeg => "mp4",
        }
    }

    /// Video formats produce one file for a whole frame range.
    pub fn is_video(self) -> bool {
        matches!(self, OutputFormat::Ffmpeg)
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Png
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "open_exr" | "openexr" | "exr" => Ok(OutputFormat::OpenExr),
            "ffmpeg" | "video" | "mp4" => Ok(OutputFormat::Ffmpeg),
            other => Err(format!(
                "unsupported output format: {other} (expected png, jpeg, open_exr or ffmpeg)"
            )),
        }
    }
}

/// GPU compute backend handed to the driver script via `--gpu-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuBackend {
    Cuda,
    Optix,
    Metal,
}

impl GpuBackend {
    pub fn token(self) -> &'static str {
        match self {
            GpuBackend::Cuda => "CUDA",
            GpuBackend::Optix => "OPTIX",
            GpuBackend::Metal => "METAL",
        }
    }
}

impl Default for GpuBackend {
    fn default() -> Self {
        GpuBackend::Optix
    }
}

impl FromStr for GpuBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cuda" => Ok(GpuBackend::Cuda),
            "optix" => Ok(GpuBackend::Optix),
            "metal" => Ok(GpuBackend::Metal),
            other => Err(format!(
                "invalid gpu_backend: {other} (expected \"cuda\", \"optix\" or \"metal\")"
            )),
        }
    }
}
