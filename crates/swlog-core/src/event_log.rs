//! The user-facing activity log.
//!
//! Entries are held newest-first. The log is the only owner of its sequence;
//! every mutation goes through [`EventLog::append`] or [`EventLog::clear`].

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::clock::Clock;
use crate::status::StatusKind;

/// A single immutable activity-log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub name: String,
    pub status: StatusKind,
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    pub fn icon(&self) -> &'static str {
        self.status.icon()
    }

    /// Timestamp in the `DD-MM-YYYY HH:MM:SS:mmm` display format.
    pub fn formatted_timestamp(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Format a timestamp as `DD-MM-YYYY HH:MM:SS:mmm`.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%d-%m-%Y %H:%M:%S:%3f").to_string()
}

/// Newest-first, optionally bounded log of lifecycle events.
///
/// With a capacity configured, appending to a full log evicts the oldest
/// entry. `count()` always equals the number of entries currently held;
/// evictions are tallied separately in [`evicted`](EventLog::evicted).
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
    evicted: u64,
    last_update: DateTime<Local>,
    clock: Box<dyn Clock>,
}

impl EventLog {
    /// Create an empty log. `capacity` of `None` means unbounded.
    pub fn new(capacity: Option<usize>, clock: Box<dyn Clock>) -> Self {
        let capacity = capacity.map(|c| c.max(1));
        Self {
            entries: VecDeque::with_capacity(capacity.unwrap_or(64).min(4096)),
            capacity,
            evicted: 0,
            last_update: clock.now(),
            clock,
        }
    }

    /// Record a new event at the front of the log and return it.
    pub fn append(&mut self, name: impl Into<String>, status: StatusKind) -> LogEntry {
        let mut timestamp = self.clock.now();
        // Reading newest-first must never go forward in time, even if the
        // wall clock is stepped backwards.
        if let Some(latest) = self.entries.front() {
            if timestamp < latest.timestamp {
                timestamp = latest.timestamp;
            }
        }

        let entry = LogEntry {
            name: name.into(),
            status,
            timestamp,
        };

        if let Some(cap) = self.capacity {
            while self.entries.len() >= cap {
                self.entries.pop_back();
                self.evicted += 1;
            }
        }

        self.entries.push_front(entry.clone());
        self.last_update = timestamp;
        entry
    }

    /// Remove every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
        self.last_update = self.clock.now();
    }

    /// Number of entries currently held.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries newest-first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn get(&self, idx: usize) -> Option<&LogEntry> {
        self.entries.get(idx)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Entries dropped by the capacity policy since the last clear.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Wall-clock time of the last append or clear.
    pub fn last_update(&self) -> DateTime<Local> {
        self.last_update
    }
}
