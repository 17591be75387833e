//! Wall-clock deadline and cooperative cancellation.
//!
//! The interpreter never gets interrupted from outside. It polls a
//! [`Deadline`] at every step creation and every loop back-edge. A
//! [`Watchdog`] is an optional helper thread that flips a shared
//! `AtomicBool` once a time budget has elapsed; the next poll sees the flag
//! and raises a timeout fault.

use super::errors::TraceError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Trace deadline plus an optional external cancellation flag
#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
    limit_seconds: f64,
    cancel: Option<Arc<AtomicBool>>,
}

impl Deadline {
    pub fn new(limit_seconds: f64, cancel: Option<Arc<AtomicBool>>) -> Self {
        let limit = Duration::try_from_secs_f64(limit_seconds).unwrap_or(Duration::MAX);
        Deadline {
            started: Instant::now(),
            limit,
            limit_seconds,
            cancel,
        }
    }

    /// Fail with a timeout fault if the deadline passed or cancellation was requested
    pub fn check(&self, line: usize) -> Result<(), TraceError> {
        let cancelled = self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        if cancelled || self.started.elapsed() > self.limit {
            return Err(TraceError::Timeout {
                limit_seconds: self.limit_seconds,
                line,
            });
        }
        Ok(())
    }

    pub fn elapsed_ns(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Background timer that sets a cancellation flag after `budget`.
///
/// Dropping the watchdog stops the timer thread.
#[derive(Debug)]
pub struct Watchdog {
    flag: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

const WATCHDOG_TICK: Duration = Duration::from_millis(5);

impl Watchdog {
    pub fn start(budget: Duration) -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_flag = Arc::clone(&flag);
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            let started = Instant::now();
            while !thread_stop.load(Ordering::Relaxed) {
                if started.elapsed() >= budget {
                    thread_flag.store(true, Ordering::Relaxed);
                    tracing::debug!(?budget, "watchdog fired");
                    return;
                }
                std::thread::sleep(WATCHDOG_TICK.min(budget));
            }
        });

        Watchdog {
            flag,
            stop,
            handle: Some(handle),
        }
    }

    /// Flag to hand to the tracer
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn fired(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_passes_before_limit() {
        let deadline = Deadline::new(60.0, None);
        assert!(deadline.check(1).is_ok());
    }

    #[test]
    fn test_cancel_flag_trips_deadline() {
        let flag = Arc::new(AtomicBool::new(false));
        let deadline = Deadline::new(60.0, Some(Arc::clone(&flag)));
        flag.store(true, Ordering::Relaxed);
        let err = deadline.check(7).unwrap_err();
        assert_eq!(
            err,
            TraceError::Timeout {
                limit_seconds: 60.0,
                line: 7
            }
        );
    }

    #[test]
    fn test_watchdog_fires_and_stops() {
        let watchdog = Watchdog::start(Duration::from_millis(10));
        let flag = watchdog.flag();
        std::thread::sleep(Duration::from_millis(100));
        assert!(flag.load(Ordering::Relaxed));
        assert!(watchdog.fired());
        drop(watchdog);

        let idle = Watchdog::start(Duration::from_secs(60));
        assert!(!idle.fired());
        // Drop must not wait for the budget to elapse
        drop(idle);
    }
}
