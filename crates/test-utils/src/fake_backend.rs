use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use renderq::exec::{ProcessOutcome, RenderBackend, RenderJob};
use renderq::job::JobId;
use renderq::progress::{ProgressEvent, ProgressParser};

/// How a scripted render ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeExit {
    Success,
    Code(i32),
    SpawnFailure,
}

/// What the fake renderer does for one job.
#[derive(Debug, Clone)]
pub struct FakeScript {
    /// Output lines, fed through the real progress parser.
    pub lines: Vec<String>,
    /// Files written into the job's output directory before exiting.
    pub files: Vec<String>,
    pub exit: FakeExit,
    /// Block after emitting lines until cancelled or released.
    pub hold: bool,
    /// Pause between lines.
    pub line_delay: Duration,
}

impl FakeScript {
    /// Exit 0 after writing the given files.
    pub fn success(files: &[&str]) -> Self {
        Self {
            lines: Vec::new(),
            files: files.iter().map(|f| f.to_string()).collect(),
            exit: FakeExit::Success,
            hold: false,
            line_delay: Duration::ZERO,
        }
    }

    /// Exit with `code` after writing the given files.
    pub fn failure(code: i32, files: &[&str]) -> Self {
        Self {
            exit: FakeExit::Code(code),
            ..Self::success(files)
        }
    }

    pub fn spawn_failure() -> Self {
        Self {
            exit: FakeExit::SpawnFailure,
            ..Self::success(&[])
        }
    }

    pub fn lines(mut self, lines: &[&str]) -> Self {
        self.lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn hold(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }
}

impl Default for FakeScript {
    fn default() -> Self {
        Self::success(&["render.png"])
    }
}

/// A render backend that never spawns a process.
///
/// - runs a [`FakeScript`] chosen by the job's input file name
/// - records which jobs were started, in order
/// - tracks how many renders run at the same time
/// - held renders finish when [`FakeBackend::release`] is called or the job
///   is cancelled
#[derive(Clone, Default)]
pub struct FakeBackend {
    default_script: FakeScript,
    scripts: Arc<Mutex<HashMap<PathBuf, FakeScript>>>,
    started: Arc<Mutex<Vec<JobId>>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
    release: Arc<Notify>,
}

impl FakeBackend {
    pub fn new(default_script: FakeScript) -> Self {
        Self {
            default_script,
            ..Self::default()
        }
    }

    /// Use `script` for jobs whose input file is named `file_name`.
    pub fn script_for(&self, file_name: &str, script: FakeScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(PathBuf::from(file_name), script);
    }

    pub fn started(&self) -> Vec<JobId> {
        self.started.lock().unwrap().clone()
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Let one held render finish.
    pub fn release(&self) {
        self.release.notify_one();
    }

    fn script(&self, job: &RenderJob) -> FakeScript {
        let name = job.input.file_name().map(PathBuf::from).unwrap_or_default();
        self.scripts
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_else(|| self.default_script.clone())
    }

    async fn run(
        &self,
        job: RenderJob,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> ProcessOutcome {
        self.started.lock().unwrap().push(job.job_id);
        let script = self.script(&job);

        if script.exit == FakeExit::SpawnFailure {
            return ProcessOutcome::SpawnFailed("fake renderer not found".to_string());
        }

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let outcome = self.play(&job, &script, &events, &cancel).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn play(
        &self,
        job: &RenderJob,
        script: &FakeScript,
        events: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
    ) -> ProcessOutcome {
        let parser = ProgressParser::new(job.params.frame_range);
        let started = Instant::now();
        let mut output = String::new();

        std::fs::create_dir_all(&job.output_dir).unwrap();
        for file in &script.files {
            std::fs::write(job.output_dir.join(file), b"pixels").unwrap();
        }

        for line in &script.lines {
            if !script.line_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return ProcessOutcome::Cancelled { output },
                    _ = tokio::time::sleep(script.line_delay) => {}
                }
            }
            if let Some(event) = parser.parse_line(line, started.elapsed()) {
                let _ = events.send(event).await;
            }
            output.push_str(line);
            output.push('\n');
        }

        if script.hold {
            tokio::select! {
                _ = cancel.cancelled() => return ProcessOutcome::Cancelled { output },
                _ = self.release.notified() => {}
            }
        }

        match script.exit {
            FakeExit::Success => ProcessOutcome::Exited,
            FakeExit::Code(code) => ProcessOutcome::Failed {
                exit_code: Some(code),
                output,
            },
            FakeExit::SpawnFailure => unreachable!("handled before the render starts"),
        }
    }
}

impl RenderBackend for FakeBackend {
    fn render(
        &self,
        job: RenderJob,
        events: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ProcessOutcome> + Send + '_>> {
        Box::pin(self.run(job, events, cancel))
    }
}
