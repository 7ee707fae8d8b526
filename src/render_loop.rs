use std::time::Instant;

/// Monotonic frame timer.
pub struct Clock {
    last: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous call (or since creation).
    pub fn get_delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        delta.as_secs_f32()
    }
}

/// Repeating per-frame task. While running, every redraw re-arms the next
/// one; once stopped no further frames are produced.
pub struct RenderLoop {
    clock: Clock,
    running: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            running: false,
            frames: 0,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            self.clock = Clock::new();
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one iteration: `reschedule` first, then `frame` with the time
    /// since the previous iteration. Returns `None` without calling either
    /// once the loop has been stopped.
    pub fn run_frame<T>(
        &mut self,
        reschedule: impl FnOnce(),
        frame: impl FnOnce(f32) -> T,
    ) -> Option<T> {
        if !self.running {
            return None;
        }

        reschedule();

        let delta = self.clock.get_delta();
        self.frames += 1;

        Some(frame(delta))
    }
}
