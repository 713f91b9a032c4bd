//! TUI rendering layer for swlog.
//!
//! Provides the dashboard layout, the status/activity-log view and the
//! console overlay. All rendering uses [`ratatui`]; [`swlog_core`] owns the
//! state and this crate only reads it.

pub mod console;
pub mod dashboard;
pub mod layout;
