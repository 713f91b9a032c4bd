use std::time::{Duration, Instant};

use crate::event_log::EventLog;
use crate::schedule::Interval;
use crate::status::StatusKind;

/// Default cadence for synthetic idle entries.
pub const DEFAULT_IDLE_PERIOD: Duration = Duration::from_millis(3000);

/// Emits periodic "idle" entries while the tracked worker is not active.
///
/// At most one repeating task exists at a time: `start` while running is a
/// no-op, and `stop` is safe to call in any state.
pub struct IdlePoller {
    enabled: bool,
    task: Option<Interval>,
    period: Duration,
    label: &'static str,
}

impl IdlePoller {
    pub fn new(period: Duration, enabled: bool, label: &'static str) -> Self {
        Self {
            enabled,
            task: None,
            period,
            label,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Turn the master switch on, starting emission if the worker is inactive.
    pub fn enable(&mut self, now: Instant, resource_active: bool, log: &mut EventLog) {
        self.enabled = true;
        if resource_active {
            self.stop();
        } else {
            self.start(now, log);
        }
    }

    /// Turn the master switch off; any running task stops immediately.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.stop();
    }

    /// Set the master switch without starting anything.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop();
        }
    }

    /// Emit one idle entry now and schedule repeats.
    ///
    /// Returns `false` without side effects when already running or disabled.
    pub fn start(&mut self, now: Instant, log: &mut EventLog) -> bool {
        if self.task.is_some() || !self.enabled {
            return false;
        }
        log.append(self.label, StatusKind::Idle);
        self.task = Some(Interval::start(now, self.period));
        tracing::debug!(period_ms = self.period.as_millis() as u64, "idle polling started");
        true
    }

    /// Cancel the repeating task. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.task.take().is_some();
        if was_running {
            tracing::debug!("idle polling stopped");
        }
        was_running
    }

    /// Drive the repeating task; appends an idle entry when a period elapsed.
    pub fn tick(&mut self, now: Instant, log: &mut EventLog) -> bool {
        let Some(task) = self.task.as_mut() else {
            return false;
        };
        if task.poll(now) {
            log.append(self.label, StatusKind::Idle);
            true
        } else {
            false
        }
    }
}
