// src/exec/command.rs

//! Renderer command line construction.

use std::ffi::OsString;
use std::io::{self, PipeWriter};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::RendererSection;
use crate::job::RenderParams;

use super::backend::RenderJob;

/// Fully resolved renderer invocation.
///
/// Built deterministically from the job and the renderer settings:
///
/// ```text
/// <executable> -b <input> -P <driver_script> -- --output <template>
///     --format <TOKEN> --samples <n> --resolution-x <w> --resolution-y <h>
///     [--use-gpu --gpu-type <BACKEND>] [--frame-start <a>] [--frame-end <b>]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl RenderCommand {
    pub fn build(renderer: &RendererSection, job: &RenderJob) -> Self {
        let params = &job.params;
        let template = output_template(&job.output_dir, params);

        let mut args: Vec<OsString> = vec![
            "-b".into(),
            job.input.clone().into(),
            "-P".into(),
            renderer.driver_script.clone().into(),
            "--".into(),
            "--output".into(),
            template.into(),
            "--format".into(),
            params.format.token().into(),
            "--samples".into(),
            params.samples.to_string().into(),
            "--resolution-x".into(),
            params.resolution_x.to_string().into(),
            "--resolution-y".into(),
            params.resolution_y.to_string().into(),
        ];

        if params.gpu {
            args.push("--use-gpu".into());
            args.push("--gpu-type".into());
            args.push(renderer.gpu_backend.token().into());
        }

        if let Some(range) = params.frame_range {
            args.push("--frame-start".into());
            args.push(range.start.to_string().into());
            args.push("--frame-end".into());
            args.push(range.end.to_string().into());
        }

        Self {
            program: renderer.executable.clone(),
            args,
        }
    }

    /// Tokio command with no stdin whose stdout and stderr both write into
    /// `output`, so the reader sees one stream in the order it was written.
    ///
    /// The child is killed if the handle is dropped, so an abandoned
    /// supervisor never leaks a render process. The returned command holds
    /// copies of `output`; drop it after spawning or the reader never sees
    /// end of file.
    pub fn to_command(&self, output: &PipeWriter) -> io::Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(output.try_clone()?)
            .stderr(output.try_clone()?)
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Space-joined rendering of the command line, for logs.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// Output path handed to the renderer.
///
/// Image-sequence animations get a `####` frame-number placeholder; stills
/// and encoded video write a single `render.<ext>`.
pub fn output_template(output_dir: &Path, params: &RenderParams) -> PathBuf {
    let ext = params.format.extension();
    if params.is_image_sequence() {
        output_dir.join(format!("frame_####.{ext}"))
    } else {
        output_dir.join(format!("render.{ext}"))
    }
}
