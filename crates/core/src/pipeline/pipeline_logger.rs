use std::time::Instant;

/// Observer for pipeline orchestration events.
///
/// Keeps the use case independent of how progress reaches the user — the CLI
/// prints, tests stay silent.
pub trait PipelineLogger: Send {
    /// Frame-level progress through the current stage.
    fn progress(&mut self, current: usize, total: usize);

    /// Human-readable status message.
    fn info(&mut self, message: &str);

    /// End-of-run summary. Default: nothing.
    fn summary(&mut self) {}
}

/// Discards every event. For tests and embedding callers with their own
/// progress channels.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn info(&mut self, _message: &str) {}
}

/// Prints progress to stdout, throttled to every `throttle_frames` frames so
/// long clips do not flood the terminal, plus a timing summary at the end.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    started: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            started: Instant::now(),
            frames_seen: 0,
        }
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = self.frames_seen.max(current);
        if current % self.throttle_frames == 0 || current == total {
            println!("frame {current}/{total}");
        }
    }

    fn info(&mut self, message: &str) {
        println!("{message}");
    }

    fn summary(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if self.frames_seen > 0 && elapsed > 0.0 {
            println!(
                "done: {} frames in {elapsed:.1}s ({:.1} fps)",
                self.frames_seen,
                self.frames_seen as f64 / elapsed
            );
        }
    }
}
