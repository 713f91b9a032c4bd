//! Core lifecycle tracking for swlog.
//!
//! This crate owns everything that is not terminal I/O: the activity log,
//! the status state machine that reconciles worker lifecycle signals, the
//! idle poller, the signal bus, the operator console and its commands, and
//! the diagnostic logging subsystem.

pub mod bus;
pub mod clock;
pub mod command;
pub mod console;
pub mod display;
pub mod event;
pub mod event_log;
pub mod logging;
pub mod poller;
pub mod schedule;
pub mod signal;
pub mod status;
pub mod tracker;
