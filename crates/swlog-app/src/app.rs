use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use swlog_config::MonitorConfig;
use swlog_core::{
    bus::EventBus,
    clock::Clock,
    command::{self, CommandContext, CommandOutput, CommandRegistry},
    console::Console,
    event::{Event, UserCommand},
    logging::{LogBuffer, LogRecord},
    schedule::Interval,
    tracker::StatusTracker,
};
use swlog_feed::{ControllerView, FeedEvent, FeedSource};

/// Records taken from the feed per frame.
const FEED_BATCH: usize = 64;
const SCROLL_STEP: usize = 10;

pub struct App {
    pub tracker: StatusTracker,
    pub console: Console,
    bus: EventBus,
    commands: CommandRegistry,
    log_buffer: LogBuffer,
    feed: Option<FeedSource>,
    view: ControllerView,
    /// Controller liveness check. Armed once the feed has delivered its
    /// first batch without halting the tracker, never after a halt.
    liveness: Option<Interval>,
    liveness_period: Duration,
    /// The feed has delivered something (or there is no feed).
    feed_seen: bool,
    scroll: usize,
    started_at: Instant,
}

impl App {
    pub fn new(
        config: &MonitorConfig,
        clock: Box<dyn Clock>,
        log_buffer: LogBuffer,
        feed: Option<FeedSource>,
        now: Instant,
    ) -> Self {
        let liveness_period = config.liveness_interval();
        let feed_seen = feed.is_none();
        Self {
            tracker: StatusTracker::new(config.tracker_options(), clock),
            console: Console::default(),
            bus: EventBus::new(),
            commands: command::builtin_registry(),
            log_buffer,
            feed,
            view: ControllerView::new(),
            liveness: feed_seen.then(|| Interval::start(now, liveness_period)),
            liveness_period,
            feed_seen,
            scroll: 0,
            started_at: now,
        }
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn is_liveness_armed(&self) -> bool {
        self.liveness.is_some()
    }

    pub fn publish(&mut self, event: Event) {
        self.bus.publish(event);
    }

    pub fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    /// Drain new entries from the shared log buffer into the console.
    pub fn sync_logs(&mut self) {
        if let Ok(mut buf) = self.log_buffer.lock() {
            for entry in buf.drain(..) {
                self.console.push_log(entry);
            }
        }
    }

    /// Publish whatever the feed delivered since the last frame.
    ///
    /// The end of the feed is logged once and the feed is dropped; the
    /// tracker keeps its last known state.
    pub fn pump_feed(&mut self) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };

        match feed.pump(FEED_BATCH) {
            Ok(events) => {
                self.feed_seen |= !events.is_empty();
                for event in events {
                    match event {
                        FeedEvent::Record(record) => {
                            if let Some(signal) = record.into_signal(&mut self.view) {
                                self.bus.publish(Event::Signal(signal));
                            }
                        }
                        FeedEvent::Malformed(message) => {
                            tracing::warn!(feed = %feed.label(), "{message}");
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(feed = %feed.label(), error = %err, "lifecycle feed ended");
                self.feed = None;
                self.feed_seen = true;
            }
        }
    }

    /// Fire the liveness check when due and publish the frame tick.
    pub fn fire_timers(&mut self, now: Instant) {
        if let Some(liveness) = self.liveness.as_mut() {
            if liveness.poll(now) {
                self.bus.publish(Event::Signal(self.view.poll_signal()));
            }
        }
        self.bus.publish(Event::Tick { now });
    }

    /// Handle one terminal key. Returns `true` when the app should quit.
    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.bus.publish(Event::Quit);
            return false;
        }

        if matches!(key.code, KeyCode::Char('`') | KeyCode::Char('~')) {
            self.console.toggle(now);
            return false;
        }

        if !self.console.is_open() {
            match key.code {
                KeyCode::Char('q') => self.bus.publish(Event::Quit),
                _ => self.bus.publish(Event::Key(key)),
            }
            return false;
        }

        match key.code {
            KeyCode::Enter => {
                let input = self.console.submit_input();
                return self.dispatch_command(&input);
            }
            KeyCode::Backspace => self.console.backspace(),
            KeyCode::Left => self.console.cursor_left(),
            KeyCode::Right => self.console.cursor_right(),
            KeyCode::Up => self.console.history_prev(),
            KeyCode::Down => self.console.history_next(),
            KeyCode::PageUp => self.console.scroll_up(SCROLL_STEP),
            KeyCode::PageDown => self.console.scroll_down(SCROLL_STEP),
            KeyCode::Esc => self.console.toggle(now),
            KeyCode::Char(c) => self.console.insert_char(c),
            _ => {}
        }
        false
    }

    /// Execute a console command. Returns `true` when it asked to quit.
    pub fn dispatch_command(&mut self, input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return false;
        }

        self.console
            .push_log(LogRecord::info("console", format!("> {trimmed}")));

        let mut ctx = CommandContext {
            tracker: &self.tracker,
            console: &mut self.console,
            bus: &mut self.bus,
            controller: self.view.current(),
            started_at: self.started_at,
        };

        match self.commands.execute(trimmed, &mut ctx) {
            CommandOutput::Lines(lines) => {
                self.console.push_lines("console", lines);
                false
            }
            CommandOutput::Quit => true,
        }
    }

    /// Apply every pending event in arrival order. Returns `true` on quit.
    pub fn drain(&mut self, now: Instant) -> bool {
        for event in self.bus.drain() {
            match event {
                Event::Quit => return true,
                Event::Tick { now } => self.tracker.tick(now),
                Event::Signal(signal) => {
                    self.view.track(&signal);
                    self.tracker.handle(signal, now);
                    if self.tracker.is_halted() && self.liveness.take().is_some() {
                        tracing::debug!("liveness check cancelled");
                    }
                }
                Event::Command(cmd) => self.apply(cmd, now),
                Event::Key(key) => self.handle_dashboard_key(key, now),
                Event::Resize { cols, rows } => {
                    tracing::debug!(cols, rows, "terminal resized");
                }
            }
        }
        self.arm_liveness(now);
        false
    }

    fn arm_liveness(&mut self, now: Instant) {
        if self.liveness.is_none() && self.feed_seen && !self.tracker.is_halted() {
            self.liveness = Some(Interval::start(now, self.liveness_period));
            let period_ms = self.liveness_period.as_millis() as u64;
            tracing::debug!(period_ms, "liveness check armed");
        }
    }

    fn apply(&mut self, cmd: UserCommand, now: Instant) {
        match cmd {
            UserCommand::ClearLogs => {
                self.tracker.clear_logs();
                self.scroll = 0;
            }
            UserCommand::ToggleIdleLogging => {
                self.tracker.toggle_idle_logging(now);
            }
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Char('c') => self.apply(UserCommand::ClearLogs, now),
            KeyCode::Char('i') => self.apply(UserCommand::ToggleIdleLogging, now),
            KeyCode::PageUp => {
                let max = self.tracker.log().count().saturating_sub(1);
                self.scroll = (self.scroll + SCROLL_STEP).min(max);
            }
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            KeyCode::Home => self.scroll = 0,
            _ => {}
        }
    }

    /// Title-bar detail for the console overlay.
    pub fn console_detail(&self) -> String {
        let idle = if self.tracker.poller().is_enabled() {
            "on"
        } else {
            "off"
        };
        let feed = self.feed.as_ref().map_or("none", FeedSource::label);
        format!("idle log: {idle}  feed: {feed}")
    }

    #[cfg(test)]
    fn next_liveness_due(&self) -> Option<Instant> {
        self.liveness.as_ref().map(Interval::next_due)
    }
}

/// Frame budget used by the main loop when polling for input.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(16);
