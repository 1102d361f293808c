use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::error::RequestError;
use super::policy::{WaitMode, WaitPolicy};
use super::pump::EventPump;

/// Waiting half of an in-flight request.
///
/// Created together with its [`Completion`] right before the request is
/// issued. The completion goes to the driver; this half stays with the caller
/// and is consumed by [`PendingRequest::wait`].
pub struct PendingRequest<T> {
    shared: Arc<Shared<T>>,
}

/// Completing half of an in-flight request.
///
/// Completing consumes the handle, so a request completes at most once.
/// Dropping it without completing marks the request abandoned.
pub struct Completion<T> {
    shared: Arc<Shared<T>>,
    done: bool,
}

struct Shared<T> {
    what: &'static str,
    state: Mutex<State<T>>,
    signal: Condvar,
}

struct State<T> {
    result: Option<T>,
    failure: Option<Failure>,
    completed: bool,
}

enum Failure {
    Reported(String),
    Abandoned,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Completion never panics while holding the lock; recover the state anyway.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> PendingRequest<T> {
    /// Creates a request named `what` (used in logs and errors).
    pub fn new(what: &'static str) -> (Self, Completion<T>) {
        let shared = Arc::new(Shared {
            what,
            state: Mutex::new(State {
                result: None,
                failure: None,
                completed: false,
            }),
            signal: Condvar::new(),
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            Completion { shared, done: false },
        )
    }

    /// Returns `true` once the completion side has reported back.
    pub fn is_completed(&self) -> bool {
        self.shared.lock().completed
    }

    /// Blocks until the request completes, pumping driver events in between.
    ///
    /// Returns the produced value on success. Completion may already have
    /// happened during issue, in which case `pump` is never called.
    pub fn wait<P>(self, pump: &mut P, policy: &WaitPolicy) -> Result<T, RequestError>
    where
        P: EventPump + ?Sized,
    {
        let what = self.shared.what;
        let started = Instant::now();

        let mut state = self.shared.lock();
        while !state.completed {
            drop(state);

            if let Err(err) = pump.pump() {
                return Err(RequestError::Pump {
                    what,
                    reason: format!("{err:#}"),
                });
            }

            state = self.shared.lock();
            if state.completed {
                break;
            }

            let waited = started.elapsed();
            if let Some(limit) = policy.timeout {
                if waited >= limit {
                    log::warn!("{what} request still pending after {waited:?}; giving up");
                    return Err(RequestError::TimedOut { what, waited });
                }
            }

            if let WaitMode::Yield(interval) = policy.mode {
                let slice = match policy.timeout {
                    Some(limit) => interval.min(limit.saturating_sub(waited)),
                    None => interval,
                };
                state = self
                    .shared
                    .signal
                    .wait_timeout(state, slice)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            } else {
                std::hint::spin_loop();
            }
        }

        debug_assert!(state.completed);

        if let Some(value) = state.result.take() {
            return Ok(value);
        }

        match state.failure.take() {
            Some(Failure::Reported(reason)) => Err(RequestError::Failed { what, reason }),
            Some(Failure::Abandoned) | None => Err(RequestError::Abandoned { what }),
        }
    }
}

impl<T> Completion<T> {
    /// Stores `value` and marks the request completed.
    pub fn succeed(mut self, value: T) {
        self.finish(Some(value), None);
    }

    /// Logs `reason` and marks the request completed without a value.
    pub fn fail(mut self, reason: impl fmt::Display) {
        let reason = reason.to_string();
        log::warn!("{} request failed: {reason}", self.shared.what);
        self.finish(None, Some(Failure::Reported(reason)));
    }

    fn finish(&mut self, result: Option<T>, failure: Option<Failure>) {
        self.done = true;

        let mut state = self.shared.lock();
        debug_assert!(!state.completed, "request completed twice");
        state.result = result;
        state.failure = failure;
        // Must stay last: waiters read `result` as soon as this flips.
        state.completed = true;
        drop(state);

        self.shared.signal.notify_all();
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if !self.done {
            log::warn!("{} request dropped without completion", self.shared.what);
            self.finish(None, Some(Failure::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;

    use super::*;

    fn policy() -> WaitPolicy {
        WaitPolicy::spin(Duration::from_secs(5))
    }

    /// Fires the stored completion on the `fire_on`-th pump step.
    struct FakeDriver<T> {
        polls: usize,
        fire_on: usize,
        completion: Option<Completion<T>>,
        outcome: Option<std::result::Result<T, String>>,
    }

    impl<T> FakeDriver<T> {
        fn new(fire_on: usize, completion: Completion<T>, outcome: std::result::Result<T, String>) -> Self {
            Self {
                polls: 0,
                fire_on,
                completion: Some(completion),
                outcome: Some(outcome),
            }
        }
    }

    impl<T> EventPump for FakeDriver<T> {
        fn pump(&mut self) -> Result<()> {
            self.polls += 1;
            if self.polls == self.fire_on {
                if let (Some(completion), Some(outcome)) = (self.completion.take(), self.outcome.take()) {
                    match outcome {
                        Ok(value) => completion.succeed(value),
                        Err(reason) => completion.fail(reason),
                    }
                }
            }
            Ok(())
        }
    }

    struct IdlePump {
        polls: usize,
    }

    impl EventPump for IdlePump {
        fn pump(&mut self) -> Result<()> {
            self.polls += 1;
            Ok(())
        }
    }

    // ── completion on the Nth poll ────────────────────────────────────────

    #[test]
    fn completes_on_nth_poll_for_many_n() {
        for n in 1..=32 {
            let (pending, completion) = PendingRequest::new("test");
            let mut driver = FakeDriver::new(n, completion, Ok(n * 10));

            let value = pending.wait(&mut driver, &policy()).unwrap();

            assert_eq!(value, n * 10);
            assert_eq!(driver.polls, n, "returned before completion was observed");
        }
    }

    #[test]
    fn yield_mode_completes_on_nth_poll() {
        let policy = WaitPolicy {
            mode: WaitMode::Yield(Duration::from_micros(50)),
            timeout: Some(Duration::from_secs(5)),
        };
        let (pending, completion) = PendingRequest::new("test");
        let mut driver = FakeDriver::new(4, completion, Ok("ready"));

        assert_eq!(pending.wait(&mut driver, &policy).unwrap(), "ready");
        assert_eq!(driver.polls, 4);
    }

    #[test]
    fn failure_status_yields_no_value() {
        for n in 1..=8 {
            let (pending, completion) = PendingRequest::<u32>::new("adapter");
            let mut driver = FakeDriver::new(n, completion, Err("no compatible adapter".into()));

            let err = pending.wait(&mut driver, &policy()).unwrap_err();

            assert_eq!(
                err,
                RequestError::Failed {
                    what: "adapter",
                    reason: "no compatible adapter".into(),
                }
            );
        }
    }

    // ── synchronous completion ────────────────────────────────────────────

    #[test]
    fn completion_during_issue_skips_pumping() {
        let (pending, completion) = PendingRequest::new("test");
        completion.succeed(7u8);
        assert!(pending.is_completed());

        let mut pump = IdlePump { polls: 0 };
        assert_eq!(pending.wait(&mut pump, &policy()).unwrap(), 7);
        assert_eq!(pump.polls, 0);
    }

    #[test]
    fn not_completed_before_callback() {
        let (pending, completion) = PendingRequest::<()>::new("test");
        assert!(!pending.is_completed());
        completion.succeed(());
        assert!(pending.is_completed());
    }

    // ── abandoned / hung drivers ──────────────────────────────────────────

    #[test]
    fn dropped_completion_is_reported_as_abandoned() {
        let (pending, completion) = PendingRequest::<u32>::new("device");
        drop(completion);

        let err = pending.wait(&mut IdlePump { polls: 0 }, &policy()).unwrap_err();
        assert_eq!(err, RequestError::Abandoned { what: "device" });
    }

    #[test]
    fn hung_driver_times_out() {
        let policy = WaitPolicy {
            mode: WaitMode::Yield(Duration::from_millis(1)),
            timeout: Some(Duration::from_millis(20)),
        };
        let (pending, _completion) = PendingRequest::<u32>::new("buffer map");
        let mut pump = IdlePump { polls: 0 };

        let err = pending.wait(&mut pump, &policy).unwrap_err();

        match err {
            RequestError::TimedOut { what, waited } => {
                assert_eq!(what, "buffer map");
                assert!(waited >= Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(pump.polls >= 1);
    }

    #[test]
    fn pump_error_is_propagated() {
        struct BrokenPump;
        impl EventPump for BrokenPump {
            fn pump(&mut self) -> Result<()> {
                anyhow::bail!("device lost")
            }
        }

        let (pending, _completion) = PendingRequest::<u32>::new("buffer map");
        let err = pending.wait(&mut BrokenPump, &policy()).unwrap_err();

        assert_eq!(err.what(), "buffer map");
        assert!(matches!(err, RequestError::Pump { .. }));
    }

    // ── cross-thread completion ───────────────────────────────────────────

    #[test]
    fn completion_from_another_thread_wakes_waiter() {
        let policy = WaitPolicy {
            mode: WaitMode::Yield(Duration::from_secs(1)),
            timeout: Some(Duration::from_secs(10)),
        };
        let (pending, completion) = PendingRequest::new("test");

        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            completion.succeed(42u64);
        });

        let started = Instant::now();
        let value = pending.wait(&mut IdlePump { polls: 0 }, &policy).unwrap();
        worker.join().unwrap();

        assert_eq!(value, 42);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
