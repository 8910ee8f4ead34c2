use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The traversal schedule the lister runs under.
///
/// Supplied by the embedding application; the lister re-reads it before
/// every sleep so an installed change takes effect at the next wakeup.
pub trait TraversalSchedule: Send + Sync + fmt::Debug {
    /// Advisory feed rate in documents per minute.
    fn rate_docs_per_minute(&self) -> i64;

    /// Seconds to wait between traversal passes; negative means wait
    /// indefinitely (until the schedule changes).
    fn retry_delay_seconds(&self) -> i64;

    /// True when traversal is switched off entirely.
    fn is_disabled(&self) -> bool;

    /// True when the current time falls inside a scheduled window.
    fn in_scheduled_interval(&self) -> bool;

    /// Seconds until the next scheduled window opens; `0` when already in
    /// one, negative when no window will open.
    fn next_interval_seconds(&self) -> i64;

    /// True when traversal should run now.
    fn should_run(&self) -> bool {
        !self.is_disabled() && self.in_scheduled_interval()
    }
}

/// Millisecond clock, injectable so cutoff arithmetic is testable.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Millis since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Err(_) => 0,
        }
    }
}
