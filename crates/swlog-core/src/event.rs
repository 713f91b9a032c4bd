use std::time::Instant;

use crate::signal::Signal;

/// Operator commands that mutate the tracker directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    ClearLogs,
    ToggleIdleLogging,
}

#[derive(Debug, Clone)]
pub enum Event {
    Tick { now: Instant },
    Key(crossterm::event::KeyEvent),
    Resize { cols: u16, rows: u16 },
    Signal(Signal),
    Command(UserCommand),
    Quit,
}
