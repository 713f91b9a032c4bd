use std::time::{Duration, Instant};

/// A deadline-based periodic task.
///
/// Holding an `Interval` means the task is scheduled; dropping it (usually by
/// setting an `Option<Interval>` to `None`) cancels it. Call
/// [`poll`](Interval::poll) from the tick loop; it reports at most one firing
/// per call so a stalled loop never produces a burst of catch-up firings.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next_due: Instant,
}

impl Interval {
    /// Schedule a task whose first firing is one period after `now`.
    pub fn start(now: Instant, period: Duration) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Return `true` if the period elapsed, re-arming for the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.period;
        if self.next_due <= now {
            // Missed periods are skipped, not replayed.
            self.next_due = now + self.period;
        }
        true
    }
}
