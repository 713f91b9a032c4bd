//! Normalized lifecycle signals consumed by the status tracker.
//!
//! These are the shapes the worker feed is normalised into. The wire-level
//! message payload ([`WorkerMessage`]) is an external contract and is kept
//! loose: unknown `type` values and statuses are carried through and ignored
//! by the tracker rather than rejected at parse time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a worker instance, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Snapshot of the controlling worker at the time a signal was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    pub state: WorkerState,
}

impl Controller {
    pub fn new(state: WorkerState) -> Self {
        Self { state }
    }

    pub fn activated() -> Self {
        Self::new(WorkerState::Activated)
    }

    pub fn is_activated(&self) -> bool {
        self.state == WorkerState::Activated
    }
}

/// Wire literal the worker uses to tag log-event messages.
pub const LOG_EVENT_TYPE: &str = "LOG_EVENT";

/// In-band message posted by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl WorkerMessage {
    pub fn log_event(status: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: LOG_EVENT_TYPE.to_string(),
            status: Some(status.into()),
            name: Some(name.into()),
        }
    }

    /// Accepts `LOG_EVENT`, `log event` and `log_event` in any case.
    pub fn is_log_event(&self) -> bool {
        let normalized = self.kind.trim().to_ascii_lowercase().replace(' ', "_");
        normalized == "log_event"
    }
}

/// A normalized lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    RegistrationSucceeded { controller: Option<Controller> },
    RegistrationFailed { reason: String },
    UpdateFound { installing: bool },
    Message {
        message: WorkerMessage,
        controller: Option<Controller>,
    },
    ControllerChange { controller: Option<Controller> },
    PeriodicPoll { controller: Option<Controller> },
    UnsupportedEnvironment,
}

impl Signal {
    /// Short stable name, used as a tracing field.
    pub fn label(&self) -> &'static str {
        match self {
            Signal::RegistrationSucceeded { .. } => "registration_succeeded",
            Signal::RegistrationFailed { .. } => "registration_failed",
            Signal::UpdateFound { .. } => "update_found",
            Signal::Message { .. } => "message",
            Signal::ControllerChange { .. } => "controller_change",
            Signal::PeriodicPoll { .. } => "periodic_poll",
            Signal::UnsupportedEnvironment => "unsupported_environment",
        }
    }
}
