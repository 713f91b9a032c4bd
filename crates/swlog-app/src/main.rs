mod app;

use std::io::{self, IsTerminal, Stdout};
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as CEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use swlog_config::MonitorConfig;
use swlog_core::{clock::SystemClock, event::Event, logging};
use swlog_feed::FeedSource;
use swlog_ui::{console::render_console, dashboard::render_dashboard};

use crate::app::{App, POLL_TIMEOUT};

/// Open the configured feed. Without one, a piped stdin is used.
fn open_feed(config: &MonitorConfig) -> Result<Option<FeedSource>> {
    if let Some(spec) = config.feed_spec() {
        let feed = FeedSource::open(&spec).context("failed to open lifecycle feed")?;
        tracing::info!(feed = %feed.label(), "lifecycle feed opened");
        return Ok(Some(feed));
    }

    if io::stdin().is_terminal() {
        tracing::info!("no lifecycle feed configured (set SWLOG_FEED or [feed] in swlog.toml)");
        return Ok(None);
    }

    tracing::info!("reading lifecycle feed from stdin");
    Ok(Some(FeedSource::stdin()))
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn main() -> Result<()> {
    let config = MonitorConfig::load()?;
    let log_buffer = logging::init(&config.log_settings());
    tracing::info!(
        idle_interval_ms = config.idle_interval_ms,
        liveness_interval_ms = config.liveness_interval_ms,
        locale = ?config.locale,
        "swlog starting up"
    );

    let feed = open_feed(&config)?;
    let app = App::new(
        &config,
        Box::new(SystemClock),
        log_buffer,
        feed,
        Instant::now(),
    );

    let mut terminal = setup_terminal()?;
    let res = run(&mut terminal, app);
    restore_terminal(terminal)?;
    tracing::info!("swlog shutting down");
    res
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut app: App) -> Result<()> {
    loop {
        // ── Collect ──
        app.sync_logs();
        app.pump_feed();

        if event::poll(POLL_TIMEOUT)? {
            match event::read()? {
                CEvent::Key(key) => {
                    if app.on_key(key, Instant::now()) {
                        return Ok(());
                    }
                }
                CEvent::Resize(cols, rows) => {
                    app.publish(Event::Resize { cols, rows });
                }
                _ => {}
            }
        }

        let now = Instant::now();
        app.fire_timers(now);

        // ── Drain → Dispatch ──
        if app.drain(now) {
            return Ok(());
        }

        // ── Render ──
        app.console.update(now);
        terminal.draw(|f| {
            render_dashboard(f, f.area(), &app.tracker, app.scroll());

            if app.console.is_visible() {
                let fraction = app.console.overlay_fraction(now);
                let show_cursor = app.console.is_open();
                render_console(
                    f,
                    f.area(),
                    &app.console,
                    &app.console_detail(),
                    fraction,
                    show_cursor,
                );
            }
        })?;
    }
}
