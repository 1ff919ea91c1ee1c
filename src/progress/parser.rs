// src/progress/parser.rs

//! Turns single lines of renderer output into progress events.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::job::{FrameRange, Progress};

use super::eta::{estimate_eta, format_eta};

static FRAME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Fra:(\d+)").expect("frame marker regex is valid"));

static SAMPLE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sample (\d+)/(\d+)").expect("sample marker regex is valid"));

const SAVE_MARKER: &str = "Saved:";

/// Percent ceiling while the renderer is still producing frames or samples.
pub const RENDER_CEILING: u8 = 90;
/// Reported once the renderer says it wrote a file.
pub const FINALIZING_PERCENT: u8 = 95;
/// Heartbeat for single-frame jobs, which have no frame-based signal.
pub const HEARTBEAT_PERCENT: u8 = 50;

/// A structured update derived from one line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
    pub current_frame: Option<i64>,
    pub total_frames: Option<u64>,
    pub eta: Option<Duration>,
}

impl ProgressEvent {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
            current_frame: None,
            total_frames: None,
            eta: None,
        }
    }

    pub fn into_progress(self) -> Progress {
        Progress {
            percent: self.percent,
            message: self.message,
            current_frame: self.current_frame,
            total_frames: self.total_frames,
            eta: self.eta.map(format_eta),
        }
    }
}

/// Stateless line parser for one job.
///
/// The only inputs besides the line are the job's frame range (fixed at
/// construction) and the wall time elapsed since the renderer started, so a
/// captured log can be replayed against it without running anything.
#[derive(Debug, Clone, Copy)]
pub struct ProgressParser {
    frame_range: Option<FrameRange>,
}

impl ProgressParser {
    pub fn new(frame_range: Option<FrameRange>) -> Self {
        Self { frame_range }
    }

    /// Parse one line. Returns `None` for lines that carry no progress signal.
    pub fn parse_line(&self, line: &str, elapsed: Duration) -> Option<ProgressEvent> {
        if let Some(frame) = parse_frame(line) {
            return Some(match self.frame_range {
                Some(range) => frame_event(frame, range, elapsed),
                None => ProgressEvent::new(HEARTBEAT_PERCENT, "Rendering..."),
            });
        }

        if line.contains(SAVE_MARKER) {
            return Some(ProgressEvent::new(FINALIZING_PERCENT, "Finalizing"));
        }

        if self.frame_range.is_none() {
            return parse_sample(line).and_then(sample_event);
        }

        None
    }
}

fn parse_frame(line: &str) -> Option<i64> {
    FRAME_MARKER
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}

fn parse_sample(line: &str) -> Option<(u64, u64)> {
    let caps = SAMPLE_MARKER.captures(line)?;
    let current = caps[1].parse().ok()?;
    let total = caps[2].parse().ok()?;
    Some((current, total))
}

fn frame_event(current_frame: i64, range: FrameRange, elapsed: Duration) -> ProgressEvent {
    let total = range.total_frames();
    // Widened so marker values far outside the range cannot overflow.
    let done = i128::from(current_frame) - i128::from(range.start) + 1;
    let done = u64::try_from(done.max(0)).unwrap_or(u64::MAX);

    let (percent, eta) = if done == 0 {
        (0, None)
    } else {
        (
            ceiling_share(u128::from(done), u128::from(total)),
            estimate_eta(elapsed, done, total),
        )
    };

    let eta_text = eta
        .map(|d| format!(" - ETA: {}", format_eta(d)))
        .unwrap_or_default();

    ProgressEvent {
        percent,
        message: format!("Rendering frame {current_frame}/{}{eta_text}", range.end),
        current_frame: Some(current_frame),
        total_frames: Some(total),
        eta,
    }
}

fn sample_event((current, total): (u64, u64)) -> Option<ProgressEvent> {
    if total == 0 {
        return None;
    }
    Some(ProgressEvent::new(
        ceiling_share(u128::from(current), u128::from(total)),
        format!("Sampling {current}/{total}"),
    ))
}

/// `floor(RENDER_CEILING * part / whole)`, capped at the ceiling.
fn ceiling_share(part: u128, whole: u128) -> u8 {
    let ceiling = u128::from(RENDER_CEILING);
    (ceiling * part / whole).min(ceiling) as u8
}
