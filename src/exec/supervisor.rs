// src/exec/supervisor.rs

//! Supervision of a single renderer process.

use std::future::Future;
use std::io::{self, PipeReader};
use std::pin::Pin;
use std::time::{Duration, Instant};

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigFile, RendererSection};
use crate::job::JobId;
use crate::progress::{ProgressEvent, ProgressParser};

use super::backend::{ProcessOutcome, RenderBackend, RenderJob};
use super::command::RenderCommand;
use super::log_tail::LogTail;

/// Progress reported once the renderer is up.
const SPAWNED_PERCENT: u8 = 10;

/// Runs the external renderer for one job at a time.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    renderer: RendererSection,
    log_tail_lines: usize,
    kill_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(renderer: RendererSection, log_tail_lines: usize, kill_grace: Duration) -> Self {
        Self {
            renderer,
            log_tail_lines,
            kill_grace,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.renderer.clone(), cfg.log_tail_lines, cfg.kill_grace)
    }

    /// Start the renderer, stream its merged output through the progress
    /// parser, and wait for it to exit or be cancelled.
    pub async fn run(
        &self,
        job: RenderJob,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> ProcessOutcome {
        if cancel.is_cancelled() {
            return ProcessOutcome::Cancelled {
                output: String::new(),
            };
        }

        if let Err(e) = tokio::fs::create_dir_all(&job.output_dir).await {
            return ProcessOutcome::SpawnFailed(format!(
                "creating output directory {:?}: {e}",
                job.output_dir
            ));
        }

        let command = RenderCommand::build(&self.renderer, &job);
        info!(
            job_id = %job.job_id,
            cmd = %command.display(),
            "starting renderer process"
        );

        let (reader, writer) = match std::io::pipe() {
            Ok(pair) => pair,
            Err(e) => return ProcessOutcome::SpawnFailed(format!("creating output pipe: {e}")),
        };

        // stdout and stderr share one pipe, so lines arrive in the order the
        // renderer wrote them.
        let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
        if let Err(e) = spawn_output_reader(reader, line_tx) {
            return ProcessOutcome::SpawnFailed(format!("reading renderer output: {e}"));
        }

        let spawned = command
            .to_command(&writer)
            .and_then(|mut cmd| cmd.spawn());
        // The child holds the only write ends from here on.
        drop(writer);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "failed to spawn renderer");
                return ProcessOutcome::SpawnFailed(format!(
                    "spawning {}: {e}",
                    command.program.display()
                ));
            }
        };

        let _ = events
            .send(ProgressEvent::new(SPAWNED_PERCENT, "Rendering..."))
            .await;

        let parser = ProgressParser::new(job.params.frame_range);
        let started = Instant::now();
        let mut tail = LogTail::new(self.log_tail_lines);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(job_id = %job.job_id, "cancellation requested; stopping renderer");
                    terminate(&mut child, self.kill_grace, job.job_id).await;
                    return ProcessOutcome::Cancelled { output: tail.render() };
                }

                line = line_rx.recv() => {
                    let Some(line) = line else { break };
                    debug!(job_id = %job.job_id, "renderer: {}", line);
                    if let Some(event) = parser.parse_line(&line, started.elapsed()) {
                        if events.send(event).await.is_err() {
                            debug!(job_id = %job.job_id, "progress receiver dropped");
                        }
                    }
                    tail.push(line);
                }
            }
        }

        // Every write end is closed; the process is exiting or already gone.
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(job_id = %job.job_id, "cancellation requested after output closed");
                terminate(&mut child, self.kill_grace, job.job_id).await;
                ProcessOutcome::Cancelled { output: tail.render() }
            }

            status = child.wait() => match status {
                Ok(status) if status.success() => {
                    info!(
                        job_id = %job.job_id,
                        elapsed_secs = started.elapsed().as_secs(),
                        "renderer exited successfully"
                    );
                    ProcessOutcome::Exited
                }
                Ok(status) => {
                    info!(
                        job_id = %job.job_id,
                        exit_code = ?status.code(),
                        "renderer exited with failure"
                    );
                    ProcessOutcome::Failed {
                        exit_code: status.code(),
                        output: tail.render(),
                    }
                }
                Err(e) => {
                    warn!(job_id = %job.job_id, error = %e, "waiting for renderer failed");
                    tail.push(format!("waiting for renderer: {e}"));
                    ProcessOutcome::Failed {
                        exit_code: None,
                        output: tail.render(),
                    }
                }
            }
        }
    }
}

impl RenderBackend for ProcessSupervisor {
    fn render(
        &self,
        job: RenderJob,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ProcessOutcome> + Send + '_>> {
        Box::pin(self.run(job, events, cancel))
    }
}

/// Start forwarding the merged output pipe into `tx`, one line per message.
#[cfg(unix)]
fn spawn_output_reader(reader: PipeReader, tx: mpsc::Sender<String>) -> io::Result<()> {
    let receiver = tokio::net::unix::pipe::Receiver::from_owned_fd(reader.into())?;
    tokio::spawn(forward_lines(receiver, tx));
    Ok(())
}

#[cfg(not(unix))]
fn spawn_output_reader(reader: PipeReader, tx: mpsc::Sender<String>) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        use std::io::BufRead;

        let mut reader = std::io::BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.blocking_send(decode_line(&buf)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "renderer output stream closed with error");
                    break;
                }
            }
        }
    });
    Ok(())
}

/// Read a pipe line by line into `tx`.
#[cfg(unix)]
async fn forward_lines<R>(stream: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(decode_line(&buf)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "renderer output stream closed with error");
                break;
            }
        }
    }
}

/// Invalid UTF-8 is replaced rather than ending the stream.
fn decode_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Ask the renderer to stop, then kill it if it is still around after
/// `grace`. Returns once the process has been reaped.
async fn terminate(child: &mut Child, grace: Duration, job_id: JobId) {
    if send_sigterm(child) {
        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(job_id = %job_id, ?status, "renderer stopped after SIGTERM");
                return;
            }
            Ok(Err(e)) => {
                warn!(job_id = %job_id, error = %e, "waiting for renderer after SIGTERM failed");
            }
            Err(_) => {
                warn!(
                    job_id = %job_id,
                    grace_secs = grace.as_secs_f64(),
                    "renderer ignored SIGTERM; killing"
                );
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(job_id = %job_id, error = %e, "failed to kill renderer process");
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    // SAFETY: `kill` takes no pointers. `child.id()` is `None` once tokio
    // has reaped the child, and reaping needs `&mut Child`, which the caller
    // cannot use while this shared borrow is alive. So `pid` still names our
    // unreaped child, whether running or a zombie, and cannot have been
    // reused by another process.
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}
