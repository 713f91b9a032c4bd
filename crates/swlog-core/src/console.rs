use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::logging::LogRecord;

/// How long the overlay takes to slide fully open or closed.
pub const SLIDE_DURATION: Duration = Duration::from_millis(150);

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slide {
    Closed,
    Opening { since: Instant },
    Open,
    Closing { since: Instant },
}

/// Drop-down operator console: scrollback, input line and command history.
pub struct Console {
    slide: Slide,
    log_lines: VecDeque<LogRecord>,
    pub input_buffer: String,
    pub cursor_pos: usize,
    scroll_offset: usize,
    max_lines: usize,
    history: VecDeque<String>,
    history_cursor: Option<usize>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Console {
    pub fn new(max_lines: usize) -> Self {
        Self {
            slide: Slide::Closed,
            log_lines: VecDeque::with_capacity(max_lines),
            input_buffer: String::new(),
            cursor_pos: 0,
            scroll_offset: 0,
            max_lines: max_lines.max(1),
            history: VecDeque::new(),
            history_cursor: None,
        }
    }

    /// Start opening or closing, reversing mid-slide if needed.
    pub fn toggle(&mut self, now: Instant) {
        self.slide = match self.slide {
            Slide::Closed | Slide::Closing { .. } => Slide::Opening { since: now },
            Slide::Open | Slide::Opening { .. } => Slide::Closing { since: now },
        };
    }

    /// Settle a finished slide. Call once per frame.
    pub fn update(&mut self, now: Instant) {
        self.slide = match self.slide {
            Slide::Opening { since } if now.saturating_duration_since(since) >= SLIDE_DURATION => {
                Slide::Open
            }
            Slide::Closing { since } if now.saturating_duration_since(since) >= SLIDE_DURATION => {
                Slide::Closed
            }
            other => other,
        };
    }

    /// Fraction of the overlay height currently shown, `0.0..=1.0`.
    pub fn overlay_fraction(&self, now: Instant) -> f64 {
        let progress = |since: Instant| {
            (now.saturating_duration_since(since).as_secs_f64() / SLIDE_DURATION.as_secs_f64())
                .min(1.0)
        };
        match self.slide {
            Slide::Closed => 0.0,
            Slide::Open => 1.0,
            Slide::Opening { since } => progress(since),
            Slide::Closing { since } => 1.0 - progress(since),
        }
    }

    /// `true` while any part of the overlay is on screen.
    pub fn is_visible(&self) -> bool {
        !matches!(self.slide, Slide::Closed)
    }

    /// `true` only when fully open; the console captures keys then.
    pub fn is_open(&self) -> bool {
        matches!(self.slide, Slide::Open)
    }

    pub fn push_log(&mut self, entry: LogRecord) {
        if self.log_lines.len() >= self.max_lines {
            self.log_lines.pop_front();
            if self.scroll_offset > 0 {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
        }
        self.log_lines.push_back(entry);
    }

    pub fn push_lines<I: IntoIterator<Item = String>>(&mut self, target: &str, lines: I) {
        for line in lines {
            self.push_log(LogRecord::info(target, line));
        }
    }

    pub fn log_lines(&self) -> &VecDeque<LogRecord> {
        &self.log_lines
    }

    pub fn clear_logs(&mut self) {
        self.log_lines.clear();
        self.scroll_offset = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn scroll_up(&mut self, amount: usize) {
        let max_offset = self.log_lines.len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + amount).min(max_offset);
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub fn insert_char(&mut self, c: char) {
        self.input_buffer.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            let prev = self.prev_boundary();
            self.input_buffer.remove(prev);
            self.cursor_pos = prev;
        }
    }

    pub fn cursor_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.prev_boundary();
        }
    }

    pub fn cursor_right(&mut self) {
        if self.cursor_pos < self.input_buffer.len() {
            self.cursor_pos = self.input_buffer[self.cursor_pos..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_pos + i)
                .unwrap_or(self.input_buffer.len());
        }
    }

    fn prev_boundary(&self) -> usize {
        self.input_buffer[..self.cursor_pos]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Recall the previous submitted command into the input line.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let idx = match self.history_cursor {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.recall(idx);
    }

    /// Move forward in history; past the newest entry clears the input.
    pub fn history_next(&mut self) {
        match self.history_cursor {
            Some(i) if i + 1 < self.history.len() => self.recall(i + 1),
            Some(_) => {
                self.history_cursor = None;
                self.input_buffer.clear();
                self.cursor_pos = 0;
            }
            None => {}
        }
    }

    fn recall(&mut self, idx: usize) {
        if let Some(cmd) = self.history.get(idx) {
            self.input_buffer = cmd.clone();
            self.cursor_pos = self.input_buffer.len();
            self.history_cursor = Some(idx);
        }
    }

    /// Submit the current input buffer. Returns the input and clears the buffer.
    pub fn submit_input(&mut self) -> String {
        let input = std::mem::take(&mut self.input_buffer);
        self.cursor_pos = 0;
        self.history_cursor = None;
        let trimmed = input.trim();
        if !trimmed.is_empty() && self.history.back().map(String::as_str) != Some(trimmed) {
            if self.history.len() >= HISTORY_LIMIT {
                self.history.pop_front();
            }
            self.history.push_back(trimmed.to_string());
        }
        input
    }
}
