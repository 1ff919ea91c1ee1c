// src/progress/eta.rs

use std::time::Duration;

/// Project the remaining render time from the running average time per frame.
///
/// Returns `None` until at least one frame has completed, or when the
/// projection does not fit in a `Duration`. The estimate is
/// recomputed from scratch on every call; there is no smoothing beyond the
/// `elapsed / frames_done` average.
pub fn estimate_eta(elapsed: Duration, frames_done: u64, total_frames: u64) -> Option<Duration> {
    if frames_done == 0 {
        return None;
    }
    let per_frame = elapsed.as_secs_f64() / frames_done as f64;
    let remaining = total_frames.saturating_sub(frames_done);
    Duration::try_from_secs_f64(per_frame * remaining as f64).ok()
}

/// `"<m>m <s>s"` from one minute upwards, `"<s>s"` below.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
