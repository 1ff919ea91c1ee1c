// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::job::RenderDefaults;
use crate::types::{GpuBackend, OutputFormat};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [renderer]
/// executable = "/opt/blender/blender"
/// driver_script = "render_script.py"
/// use_gpu = true
/// gpu_backend = "optix"
///
/// [defaults]
/// format = "png"
/// samples = 128
/// resolution_x = 1920
/// resolution_y = 1080
///
/// [scheduler]
/// render_slots = 1
/// queue_horizon = "30m"
///
/// [supervisor]
/// log_tail_lines = 200
/// kill_grace = "10s"
///
/// [paths]
/// output_root = "rendered"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub renderer: RendererSection,

    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub paths: PathsSection,
}

/// `[renderer]` section: how to invoke the external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RendererSection {
    /// Renderer executable. Overridden by `BLENDER_PATH` when set.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Driver script passed with `-P`; applies the render settings inside
    /// the renderer.
    #[serde(default = "default_driver_script")]
    pub driver_script: PathBuf,

    /// Default for jobs that do not say whether to use the GPU.
    #[serde(default = "default_true")]
    pub use_gpu: bool,

    #[serde(default)]
    pub gpu_backend: GpuBackend,
}

fn default_executable() -> PathBuf {
    PathBuf::from("blender")
}

fn default_driver_script() -> PathBuf {
    PathBuf::from("render_script.py")
}

fn default_true() -> bool {
    true
}

impl Default for RendererSection {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            driver_script: default_driver_script(),
            use_gpu: true,
            gpu_backend: GpuBackend::default(),
        }
    }
}

/// `[defaults]` section: values for render parameters a request leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DefaultsSection {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_samples")]
    pub samples: u32,

    #[serde(default = "default_resolution_x")]
    pub resolution_x: u32,

    #[serde(default = "default_resolution_y")]
    pub resolution_y: u32,
}

fn default_samples() -> u32 {
    128
}

fn default_resolution_x() -> u32 {
    1920
}

fn default_resolution_y() -> u32 {
    1080
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            samples: default_samples(),
            resolution_x: default_resolution_x(),
            resolution_y: default_resolution_y(),
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerSection {
    /// Number of renders that may run at once. Render processes usually own
    /// the GPU, hence the default of 1.
    #[serde(default = "default_render_slots")]
    pub render_slots: usize,

    /// Queue wait after which a job is logged as having waited too long when
    /// it is finally dequeued. Jobs are never dropped for waiting.
    #[serde(default = "default_queue_horizon")]
    pub queue_horizon: String,
}

fn default_render_slots() -> usize {
    1
}

fn default_queue_horizon() -> String {
    "30m".to_string()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            render_slots: default_render_slots(),
            queue_horizon: default_queue_horizon(),
        }
    }
}

/// `[supervisor]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupervisorSection {
    /// How many trailing output lines a failed job keeps as its diagnostic.
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,

    /// Time between SIGTERM and SIGKILL when cancelling a render.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,
}

fn default_log_tail_lines() -> usize {
    200
}

fn default_kill_grace() -> String {
    "10s".to_string()
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            log_tail_lines: default_log_tail_lines(),
            kill_grace: default_kill_grace(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsSection {
    /// Each job renders into `<output_root>/<job_id>/`.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("rendered")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
        }
    }
}

/// Validated configuration with durations parsed.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (or the
/// loader), so holding one means the values passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub renderer: RendererSection,
    pub defaults: DefaultsSection,
    pub render_slots: usize,
    pub queue_horizon: Duration,
    pub log_tail_lines: usize,
    pub kill_grace: Duration,
    pub output_root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        queue_horizon: Duration,
        kill_grace: Duration,
    ) -> Self {
        Self {
            renderer: raw.renderer,
            defaults: raw.defaults,
            render_slots: raw.scheduler.render_slots,
            queue_horizon,
            log_tail_lines: raw.supervisor.log_tail_lines,
            kill_grace,
            output_root: raw.paths.output_root,
        }
    }

    /// Request defaults derived from `[defaults]` and `[renderer].use_gpu`.
    pub fn render_defaults(&self) -> RenderDefaults {
        RenderDefaults {
            format: self.defaults.format,
            samples: self.defaults.samples,
            resolution_x: self.defaults.resolution_x,
            resolution_y: self.defaults.resolution_y,
            use_gpu: self.renderer.use_gpu,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            renderer: RendererSection::default(),
            defaults: DefaultsSection::default(),
            render_slots: default_render_slots(),
            queue_horizon: Duration::from_secs(30 * 60),
            log_tail_lines: default_log_tail_lines(),
            kill_grace: Duration::from_secs(10),
            output_root: default_output_root(),
        }
    }
}
