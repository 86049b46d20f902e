//! Explore panel (1): range averages and the daily cross-market snapshot.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::AppState;
use crate::theme;
use crate::ui::{range_line, result_lines};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let explore = &app.explore;
    let mut lines: Vec<Line> = vec![range_line(app), Line::from("")];

    if explore.pending > 0 {
        lines.push(Line::from(Span::styled("Loading...", theme::neutral())));
    }
    if let Some(err) = &explore.error {
        lines.push(Line::from(Span::styled(format!("Query failed: {err}"), theme::negative())));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled("Averages", theme::accent_bold())));
    match &explore.summary {
        Some(summary) => {
            let values = [summary.btc, summary.oil, summary.sp500, summary.nifty];
            for ((label, text), value) in summary.labeled().into_iter().zip(values) {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {label:<16}"), theme::muted()),
                    Span::styled(text, theme::average_style(value)),
                ]));
            }
        }
        None => lines.push(Line::from(Span::styled("  -", theme::muted()))),
    }
    lines.push(Line::from(""));

    lines.push(Line::from(vec![
        Span::styled("Daily snapshot", theme::accent_bold()),
        Span::styled("  [j/k]scroll", theme::muted()),
    ]));
    if let Some(snapshot) = &explore.snapshot {
        let height = (area.height as usize).saturating_sub(lines.len() + 3).max(1);
        lines.extend(result_lines(snapshot, explore.scroll, height));
    }

    f.render_widget(Paragraph::new(lines), area);
}
