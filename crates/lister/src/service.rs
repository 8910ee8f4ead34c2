use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared shutdown state for one generation of traversers.
///
/// Reconfiguration replaces the service wholesale; traversers holding a
/// reference to an old generation still observe its (now set) shutdown flag
/// and exit. The flag is sticky: once set it never clears.
#[derive(Debug, Default)]
pub(crate) struct TraversalService {
    shutdown: Mutex<bool>,
    wake: Condvar,
}

impl TraversalService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.shutdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once shutdown has been requested.
    pub(crate) fn is_shutdown(&self) -> bool {
        *self.lock()
    }

    /// Requests shutdown and wakes every sleeper.
    pub(crate) fn shutdown_now(&self) {
        *self.lock() = true;
        self.wake.notify_all();
    }

    /// Sleeps up to `duration`, returning early (with `true`) on shutdown.
    pub(crate) fn sleep(&self, duration: Duration) -> bool {
        let mut is_shutdown = self.lock();
        let mut remaining = duration;
        loop {
            if *is_shutdown {
                return true;
            }
            if remaining.is_zero() {
                return false;
            }
            let start = std::time::Instant::now();
            let (guard, timeout) = self
                .wake
                .wait_timeout(is_shutdown, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            is_shutdown = guard;
            if timeout.timed_out() {
                return *is_shutdown;
            }
            remaining = remaining.saturating_sub(start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn sleep_runs_to_completion_without_shutdown() {
        let service = TraversalService::new();
        let start = Instant::now();
        let woke = service.sleep(Duration::from_millis(30));
        assert!(!woke);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn shutdown_wakes_a_sleeping_traverser() {
        let service = Arc::new(TraversalService::new());
        let sleeper = Arc::clone(&service);

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let woke = sleeper.sleep(Duration::from_secs(60));
            (woke, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        service.shutdown_now();

        let (woke, elapsed) = handle.join().expect("join");
        assert!(woke);
        assert!(elapsed < Duration::from_secs(10));
    }

    #[test]
    fn shutdown_is_sticky() {
        let service = TraversalService::new();
        service.shutdown_now();
        assert!(service.is_shutdown());
        // A sleep after shutdown returns immediately.
        let start = Instant::now();
        assert!(service.sleep(Duration::from_secs(60)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
