//! Display contract between the tracker and the presentation layer.
//!
//! Everything here is a pure function of tracker state: fixed entry labels,
//! the pluralised event counter and the last-update stamp.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::event_log::EventLog;

/// Language used for fixed entry names and counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

/// Fixed human labels used by the tracker and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub registered: &'static str,
    pub registration_error: &'static str,
    pub active: &'static str,
    pub installed_waiting: &'static str,
    pub idle: &'static str,
    pub unsupported: &'static str,
    pub unsupported_status: &'static str,
    pub event_singular: &'static str,
    pub event_plural: &'static str,
    pub disable_idle: &'static str,
    pub enable_idle: &'static str,
}

const EN: Labels = Labels {
    registered: "Registered",
    registration_error: "Registration error",
    active: "Active",
    installed_waiting: "Installed/waiting",
    idle: "Idle",
    unsupported: "Browser not supported",
    unsupported_status: "Not supported",
    event_singular: "event",
    event_plural: "events",
    disable_idle: "Disable idle log",
    enable_idle: "Enable idle log",
};

const ES: Labels = Labels {
    registered: "Registrado",
    registration_error: "Error de registro",
    active: "Activo",
    installed_waiting: "Instalado/wait",
    idle: "Ocioso",
    unsupported: "Navegador no compatible",
    unsupported_status: "No compatible",
    event_singular: "evento",
    event_plural: "eventos",
    disable_idle: "Desactivar Log Ocioso",
    enable_idle: "Activar Log Ocioso",
};

impl Labels {
    pub fn for_locale(locale: Locale) -> &'static Labels {
        match locale {
            Locale::En => &EN,
            Locale::Es => &ES,
        }
    }

    /// Label for the idle-logging toggle, describing what pressing it does.
    pub fn idle_toggle(&self, enabled: bool) -> &'static str {
        if enabled {
            self.disable_idle
        } else {
            self.enable_idle
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        EN
    }
}

/// `"1 event"` / `"N events"`, pluralised by the locale's labels.
pub fn events_label(count: usize, labels: &Labels) -> String {
    let noun = if count == 1 {
        labels.event_singular
    } else {
        labels.event_plural
    };
    format!("{} {}", count, noun)
}

/// Wall-clock time of day, `HH:MM:SS`.
pub fn format_time_of_day(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Counter block shown under the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counters {
    pub total: usize,
    pub events_label: String,
    pub last_update: DateTime<Local>,
}

impl Counters {
    pub fn from_log(log: &EventLog, labels: &Labels) -> Self {
        let total = log.count();
        Self {
            total,
            events_label: events_label(total, labels),
            last_update: log.last_update(),
        }
    }

    pub fn last_update_label(&self) -> String {
        format_time_of_day(&self.last_update)
    }
}
