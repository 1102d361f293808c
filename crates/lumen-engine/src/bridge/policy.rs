use std::time::Duration;

/// How the waiting thread behaves between two pump steps.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WaitMode {
    /// Pump again immediately.
    ///
    /// Suited to drivers that only make progress when polled.
    Spin,
    /// Block on the request's condition variable for at most the given
    /// interval, then pump again.
    ///
    /// A completion fired from another thread wakes the waiter early.
    Yield(Duration),
}

/// Bounds and pacing for a bridged wait.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WaitPolicy {
    pub mode: WaitMode,

    /// Upper bound on the total wait. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WaitPolicy {
    /// Spins with the given timeout.
    pub const fn spin(timeout: Duration) -> Self {
        Self {
            mode: WaitMode::Spin,
            timeout: Some(timeout),
        }
    }

    /// Returns a copy of this policy with a different timeout.
    pub const fn with_timeout(self, timeout: Option<Duration>) -> Self {
        Self {
            mode: self.mode,
            timeout,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            mode: WaitMode::Yield(Duration::from_millis(1)),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}
