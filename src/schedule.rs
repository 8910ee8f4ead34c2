//! Fixed-interval schedule used when no external scheduler is attached.

use fscrawl_lister::TraversalSchedule;

use crate::config::ScheduleSection;

/// Always-in-window schedule with a fixed delay between passes.
#[derive(Debug)]
pub struct IntervalSchedule {
    retry_delay_seconds: i64,
    disabled: bool,
}

impl IntervalSchedule {
    /// Builds the schedule from its configuration table.
    #[must_use]
    pub fn new(section: &ScheduleSection) -> Self {
        Self {
            retry_delay_seconds: section.retry_delay_seconds,
            disabled: section.disabled,
        }
    }
}

impl TraversalSchedule for IntervalSchedule {
    fn rate_docs_per_minute(&self) -> i64 {
        0
    }

    fn retry_delay_seconds(&self) -> i64 {
        self.retry_delay_seconds
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn in_scheduled_interval(&self) -> bool {
        !self.disabled
    }

    fn next_interval_seconds(&self) -> i64 {
        if self.disabled { -1 } else { 0 }
    }
}
