// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::job::RenderRequest;

/// Command-line arguments for `renderq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "renderq",
    version,
    about = "Queue scene renders, follow their progress and collect the output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Renderq.toml` in the current working directory. Built-in
    /// defaults are used when the file does not exist.
    #[arg(long, value_name = "PATH", default_value = "Renderq.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RENDERQ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Render one scene file and wait for the result.
    Render(RenderArgs),

    /// Validate the config and print the effective settings.
    Check,
}

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Scene file to render. It is removed once the job finishes.
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    /// Output format: png, jpeg, open_exr or ffmpeg.
    #[arg(long)]
    pub format: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub samples: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    pub resolution_x: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    pub resolution_y: Option<i64>,

    /// First frame of an animation. Requires `--frame-end`.
    #[arg(long, allow_negative_numbers = true)]
    pub frame_start: Option<i64>,

    /// Last frame of an animation. Requires `--frame-start`.
    #[arg(long, allow_negative_numbers = true)]
    pub frame_end: Option<i64>,

    /// Force GPU rendering on.
    #[arg(long, conflicts_with = "no_gpu")]
    pub gpu: bool,

    /// Force GPU rendering off.
    #[arg(long)]
    pub no_gpu: bool,

    /// Print status updates and the final snapshot as JSON lines.
    #[arg(long)]
    pub json: bool,
}

impl RenderArgs {
    /// Build the submission request; unset flags fall back to config defaults.
    pub fn to_request(&self) -> RenderRequest {
        let gpu = match (self.gpu, self.no_gpu) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        RenderRequest {
            input: self.scene.clone(),
            format: self.format.clone(),
            samples: self.samples,
            resolution_x: self.resolution_x,
            resolution_y: self.resolution_y,
            frame_start: self.frame_start,
            frame_end: self.frame_end,
            gpu,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
