use serde::{Deserialize, Deserializer, Serialize};
use swlog_core::signal::{Controller, Signal, WorkerMessage};

/// Reason used when a failed registration record carries no `error` text.
pub const DEFAULT_REGISTRATION_ERROR: &str = "registration failed";

/// One line of the feed: a record plus an optional replay delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLine {
    /// Milliseconds the reader waits before delivering this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(flatten)]
    pub record: FeedRecord,
}

/// Lifecycle record as written by a feed producer, tagged by `kind`.
///
/// `controller` is `None` when the key is absent (the producer said nothing
/// about the controller) and `Some(None)` for an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedRecord {
    /// Startup capability probe.
    Capability { supported: bool },
    Registration {
        ok: bool,
        #[serde(default, deserialize_with = "reported", skip_serializing_if = "Option::is_none")]
        controller: Option<Option<Controller>>,
        #[serde(default)]
        error: Option<String>,
    },
    UpdateFound {
        #[serde(default)]
        installing: bool,
    },
    Message {
        data: WorkerMessage,
        #[serde(default, deserialize_with = "reported", skip_serializing_if = "Option::is_none")]
        controller: Option<Option<Controller>>,
    },
    ControllerChange {
        #[serde(default, deserialize_with = "reported", skip_serializing_if = "Option::is_none")]
        controller: Option<Option<Controller>>,
    },
    /// Snapshot of the current controller; feeds the liveness poll only.
    Controller {
        #[serde(default, deserialize_with = "reported", skip_serializing_if = "Option::is_none")]
        controller: Option<Option<Controller>>,
    },
}

impl FeedRecord {
    /// Normalise into a tracker signal, updating `view` with any controller
    /// the record carries. Capability probes that pass and bare controller
    /// snapshots produce no signal.
    pub fn into_signal(self, view: &mut ControllerView) -> Option<Signal> {
        match self {
            FeedRecord::Capability { supported: true } => None,
            FeedRecord::Capability { supported: false } => Some(Signal::UnsupportedEnvironment),
            FeedRecord::Registration {
                ok: true,
                controller,
                ..
            } => Some(Signal::RegistrationSucceeded {
                controller: view.observe(controller),
            }),
            FeedRecord::Registration {
                ok: false, error, ..
            } => Some(Signal::RegistrationFailed {
                reason: error.unwrap_or_else(|| DEFAULT_REGISTRATION_ERROR.to_string()),
            }),
            FeedRecord::UpdateFound { installing } => Some(Signal::UpdateFound { installing }),
            FeedRecord::Message { data, controller } => Some(Signal::Message {
                message: data,
                controller: view.observe(controller),
            }),
            FeedRecord::ControllerChange { controller } => Some(Signal::ControllerChange {
                controller: view.observe(controller),
            }),
            FeedRecord::Controller { controller } => {
                view.observe(controller);
                None
            }
        }
    }
}

fn reported<'de, D>(deserializer: D) -> Result<Option<Option<Controller>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Controller>::deserialize(deserializer).map(Some)
}

/// Latest controller snapshot seen on the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerView {
    current: Option<Controller>,
}

impl ControllerView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Controller> {
        self.current
    }

    pub fn set(&mut self, controller: Option<Controller>) {
        self.current = controller;
    }

    /// Apply a controller report and return the controller now in effect.
    /// An absent report keeps the last known controller.
    pub fn observe(&mut self, reported: Option<Option<Controller>>) -> Option<Controller> {
        if let Some(controller) = reported {
            self.current = controller;
        }
        self.current
    }

    /// Follow the controller carried by a signal applied outside the feed,
    /// such as one injected from the console.
    pub fn track(&mut self, signal: &Signal) {
        match signal {
            Signal::RegistrationSucceeded { controller }
            | Signal::Message { controller, .. }
            | Signal::ControllerChange { controller }
            | Signal::PeriodicPoll { controller } => self.current = *controller,
            Signal::RegistrationFailed { .. }
            | Signal::UpdateFound { .. }
            | Signal::UnsupportedEnvironment => {}
        }
    }

    /// Signal for the periodic liveness check.
    pub fn poll_signal(&self) -> Signal {
        Signal::PeriodicPoll {
            controller: self.current,
        }
    }
}
