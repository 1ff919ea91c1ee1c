// src/exec/log_tail.rs

use std::collections::VecDeque;

/// Keeps the last `capacity` lines of renderer output.
///
/// The terminating error of a failed render is almost always at the end of
/// its log, so older lines are dropped first.
#[derive(Debug, Clone)]
pub struct LogTail {
    lines: VecDeque<String>,
    capacity: usize,
    dropped: u64,
}

impl LogTail {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines that fell off the front.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Join the retained lines, noting how many were omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.dropped > 0 {
            out.push_str(&format!("... ({} earlier lines omitted)\n", self.dropped));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(line);
        }
        out
    }
}
