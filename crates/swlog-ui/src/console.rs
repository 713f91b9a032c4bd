use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use unicode_width::UnicodeWidthStr;

use swlog_core::console::Console;
use swlog_core::logging::LogLevel;

pub fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Error => Color::Red,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Info => Color::Green,
        LogLevel::Debug => Color::Cyan,
        LogLevel::Trace => Color::DarkGray,
    }
}

/// Render the drop-down console over the top half of `area`.
///
/// `fraction` is the slide position from [`Console::overlay_fraction`];
/// `detail` is shown in the title bar next to the close hint.
pub fn render_console(
    f: &mut Frame,
    area: Rect,
    console: &Console,
    detail: &str,
    fraction: f64,
    show_cursor: bool,
) {
    let max_height = area.height / 2;
    let mut overlay_height = ((max_height as f64) * fraction).round() as u16;
    // title + log + input
    if overlay_height < 3 {
        if fraction > 0.0 && area.height >= 3 {
            overlay_height = 3;
        } else {
            return;
        }
    }
    let overlay = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: overlay_height,
    };

    f.render_widget(Clear, overlay);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(overlay);

    let title = Line::from(vec![
        Span::styled(
            " CONSOLE ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {detail}  ")),
        Span::styled("` to close", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(
        Paragraph::new(title).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        chunks[0],
    );

    let log_lines = console.log_lines();
    let visible_height = chunks[1].height as usize;
    let total = log_lines.len();
    let end = total.saturating_sub(console.scroll_offset());
    let start = end.saturating_sub(visible_height);

    let lines: Vec<Line> = log_lines
        .iter()
        .skip(start)
        .take(end - start)
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!(" {:5} ", entry.level),
                    Style::default()
                        .fg(level_color(entry.level))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("[{}] ", entry.target),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(entry.message.as_str()),
            ])
        })
        .collect();

    let log_block = Block::default()
        .borders(Borders::LEFT | Borders::RIGHT)
        .style(Style::default().bg(Color::Black));

    f.render_widget(
        Paragraph::new(lines)
            .block(log_block)
            .wrap(Wrap { trim: false }),
        chunks[1],
    );

    let input_line = Line::from(vec![
        Span::styled(
            "> ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(console.input_buffer.as_str()),
    ]);
    f.render_widget(
        Paragraph::new(input_line).style(Style::default().bg(Color::Black).fg(Color::White)),
        chunks[2],
    );

    if show_cursor {
        let display_col = console.input_buffer[..console.cursor_pos].width() as u16;
        f.set_cursor_position((chunks[2].x + 2 + display_col, chunks[2].y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
    use swlog_core::logging::LogRecord;

    fn render(console: &Console, fraction: f64) -> Buffer {
        let backend = TestBackend::new(60, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| render_console(f, f.area(), console, "idle log on", fraction, true))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn open_console_shows_title_logs_and_input() {
        let mut console = Console::new(100);
        console.push_log(LogRecord::info("swlog_feed", "feed closed"));
        for c in "status".chars() {
            console.insert_char(c);
        }

        let buf = render(&console, 1.0);
        assert!(row(&buf, 0).contains("CONSOLE"));
        assert!(row(&buf, 0).contains("idle log on"));

        let body: String = (1..9).map(|y| row(&buf, y)).collect();
        assert!(body.contains("feed closed"));
        assert!(body.contains("[swlog_feed]"));
        assert!(row(&buf, 9).contains("> status"));
    }

    #[test]
    fn newest_lines_win_when_log_overflows() {
        let mut console = Console::new(100);
        for i in 0..30 {
            console.push_log(LogRecord::info("t", format!("line-{i:02}")));
        }
        let buf = render(&console, 1.0);
        let body: String = (1..9).map(|y| row(&buf, y)).collect();
        assert!(body.contains("line-29"));
        assert!(!body.contains("line-00"));
    }

    #[test]
    fn hidden_console_draws_nothing() {
        let console = Console::new(10);
        let buf = render(&console, 0.0);
        assert!(!row(&buf, 0).contains("CONSOLE"));
    }

    #[test]
    fn sliding_console_keeps_minimum_height() {
        let console = Console::new(10);
        let buf = render(&console, 0.05);
        assert!(row(&buf, 0).contains("CONSOLE"));
        assert!(row(&buf, 2).contains(">"));
    }
}
