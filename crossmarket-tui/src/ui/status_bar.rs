//! Bottom status bar: panel hints, pending work, last message.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{AppState, Panel, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = vec![Span::raw(" ")];

    for i in 0..4 {
        let Some(panel) = Panel::from_index(i) else { continue };
        let style = if panel == app.active_panel {
            theme::accent_bold()
        } else {
            theme::muted()
        };
        spans.push(Span::styled(format!("{}:{} ", i + 1, panel.label()), style));
    }
    spans.push(Span::styled("| ", theme::muted()));

    let busy = app.explore.pending > 0 || app.queries.running || app.crypto.loading;
    if busy {
        spans.push(Span::styled("[busy] ", theme::neutral()));
    }
    if app.dates.is_editing() {
        spans.push(Span::styled("editing date: Enter apply, Esc cancel ", theme::warning()));
    } else if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
