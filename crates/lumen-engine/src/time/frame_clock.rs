use std::time::Instant;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the clock was created or reset.
    ///
    /// Fed to shaders as the animation time uniform.
    pub elapsed: f32,
}

/// Frame clock producing `FrameTime` snapshots.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restarts elapsed time from zero.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Samples the clock for the frame about to be drawn.
    pub fn tick(&mut self) -> FrameTime {
        FrameTime {
            elapsed: Instant::now()
                .saturating_duration_since(self.start)
                .as_secs_f32(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.tick();
        assert!(b.elapsed >= a.elapsed);
        assert!(b.elapsed > 0.0);
    }

    #[test]
    fn reset_restarts_elapsed() {
        let mut clock = FrameClock::new();
        std::thread::sleep(Duration::from_millis(20));
        let before = clock.tick().elapsed;

        clock.reset();
        let after = clock.tick().elapsed;

        assert!(after < before, "{after} should be below {before}");
    }
}
