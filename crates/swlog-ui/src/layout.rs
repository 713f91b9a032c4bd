use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Rows used by the footer: a border, the counters line and the key hints.
pub const FOOTER_HEIGHT: u16 = 3;

#[derive(Debug, Clone, Copy)]
pub struct DashboardRects {
    pub top: Rect,
    pub log: Rect,
    pub footer: Rect,
}

pub fn dashboard_layout(area: Rect, footer_height: u16) -> DashboardRects {
    let footer_height = footer_height.min(area.height.saturating_sub(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),             // top bar
            Constraint::Min(1),                // activity log
            Constraint::Length(footer_height), // counters
        ])
        .split(area);

    DashboardRects {
        top: chunks[0],
        log: chunks[1],
        footer: chunks[2],
    }
}
