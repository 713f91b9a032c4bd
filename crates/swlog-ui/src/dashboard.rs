use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use swlog_core::event_log::LogEntry;
use swlog_core::status::StatusKind;
use swlog_core::tracker::StatusTracker;

use crate::layout::{dashboard_layout, FOOTER_HEIGHT};

const INDICATOR_ON: &str = "●";
const INDICATOR_OFF: &str = "○";
const NAME_COLUMN: usize = 32;
const KEY_HINTS: &str = "c clear  i idle log  ` console  PgUp/PgDn scroll  q quit";

pub fn status_color(status: StatusKind) -> Color {
    match status {
        StatusKind::Idle => Color::DarkGray,
        StatusKind::Registered => Color::Blue,
        StatusKind::Installed => Color::Cyan,
        StatusKind::Activating => Color::Yellow,
        StatusKind::Fetching => Color::Magenta,
        StatusKind::Active => Color::Green,
        StatusKind::Error => Color::Red,
    }
}

/// Largest useful scroll offset for `total` rows in a `visible`-row window.
pub fn clamp_scroll(scroll: usize, total: usize, visible: usize) -> usize {
    scroll.min(total.saturating_sub(visible))
}

/// Render the full dashboard: top bar, activity log and counters footer.
///
/// `scroll` counts rows skipped from the newest entry.
pub fn render_dashboard(f: &mut Frame, area: Rect, tracker: &StatusTracker, scroll: usize) {
    let rects = dashboard_layout(area, FOOTER_HEIGHT);

    let top = Paragraph::new(top_bar(tracker)).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(top, rects.top);

    let visible = rects.log.height as usize;
    let log = tracker.log();
    let scroll = clamp_scroll(scroll, log.count(), visible);
    let lines: Vec<Line> = log.entries().skip(scroll).take(visible).map(entry_line).collect();
    f.render_widget(Paragraph::new(lines), rects.log);

    let counters = tracker.counters();
    let labels = tracker.labels();
    let footer = Text::from(vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", counters.total),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("| {} | ", counters.events_label)),
            Span::raw(counters.last_update_label()),
            Span::raw(" | "),
            Span::styled(
                format!("[i] {}", labels.idle_toggle(tracker.poller().is_enabled())),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray))),
    ]);
    f.render_widget(
        Paragraph::new(footer).block(Block::default().borders(Borders::TOP)),
        rects.footer,
    );
}

fn top_bar(tracker: &StatusTracker) -> Line<'_> {
    let (indicator, color) = if tracker.indicator_on() {
        (INDICATOR_ON, Color::Green)
    } else {
        (INDICATOR_OFF, Color::DarkGray)
    };
    let text_style = tracker
        .current_status()
        .map(|status| Style::default().fg(status_color(status)))
        .unwrap_or_default();

    Line::from(vec![
        Span::styled("SWLOG ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(indicator, Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(tracker.status_text(), text_style),
    ])
}

fn entry_line(entry: &LogEntry) -> Line<'_> {
    let pad = NAME_COLUMN.saturating_sub(entry.name.width());
    Line::from(vec![
        Span::raw(format!("{} ", entry.icon())),
        Span::raw(format!("{}{} ", entry.name, " ".repeat(pad))),
        Span::styled(
            entry.formatted_timestamp(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", entry.status),
            Style::default()
                .fg(status_color(entry.status))
                .add_modifier(Modifier::BOLD),
        ),
    ])
}
