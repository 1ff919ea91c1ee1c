#![allow(dead_code)]

use std::path::{Path, PathBuf};

use renderq::config::{ConfigFile, RawConfigFile};
use renderq::job::RenderRequest;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.renderer.executable = path.into();
        self
    }

    pub fn driver_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.renderer.driver_script = path.into();
        self
    }

    pub fn use_gpu(mut self, val: bool) -> Self {
        self.config.renderer.use_gpu = val;
        self
    }

    pub fn render_slots(mut self, slots: usize) -> Self {
        self.config.scheduler.render_slots = slots;
        self
    }

    pub fn queue_horizon(mut self, horizon: &str) -> Self {
        self.config.scheduler.queue_horizon = horizon.to_string();
        self
    }

    pub fn log_tail_lines(mut self, lines: usize) -> Self {
        self.config.supervisor.log_tail_lines = lines;
        self
    }

    pub fn kill_grace(mut self, grace: &str) -> Self {
        self.config.supervisor.kill_grace = grace.to_string();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.output_root = path.into();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RenderRequest`.
pub struct RenderRequestBuilder {
    request: RenderRequest,
}

impl RenderRequestBuilder {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            request: RenderRequest::new(input),
        }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.request.format = Some(format.to_string());
        self
    }

    pub fn samples(mut self, samples: i64) -> Self {
        self.request.samples = Some(samples);
        self
    }

    pub fn resolution(mut self, x: i64, y: i64) -> Self {
        self.request.resolution_x = Some(x);
        self.request.resolution_y = Some(y);
        self
    }

    pub fn frames(mut self, start: i64, end: i64) -> Self {
        self.request.frame_start = Some(start);
        self.request.frame_end = Some(end);
        self
    }

    pub fn frame_start(mut self, start: i64) -> Self {
        self.request.frame_start = Some(start);
        self
    }

    pub fn frame_end(mut self, end: i64) -> Self {
        self.request.frame_end = Some(end);
        self
    }

    pub fn gpu(mut self, val: bool) -> Self {
        self.request.gpu = Some(val);
        self
    }

    pub fn build(self) -> RenderRequest {
        self.request
    }
}

/// Create a placeholder scene file at `dir/name` and return its path.
pub fn scene_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"scene").expect("failed to write scene file");
    path
}
