//! Queries panel (2): grouped catalog on the left, SQL and result on the right.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crossmarket_runner::catalog;

use crate::app::AppState;
use crate::theme;
use crate::ui::result_lines;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_catalog(f, cols[0], app);
    render_result(f, cols[1], app);
}

fn render_catalog(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    let mut cursor_line = 0;
    let mut group = None;

    for (i, entry) in catalog::entries().iter().enumerate() {
        if group != Some(entry.group) {
            group = Some(entry.group);
            lines.push(Line::from(Span::styled(
                format!("── {} ──", entry.group),
                theme::neutral(),
            )));
        }
        let style = if i == app.queries.cursor {
            cursor_line = lines.len();
            theme::cursor()
        } else {
            theme::secondary()
        };
        lines.push(Line::from(Span::styled(format!(" {}", entry.title), style)));
    }

    // keep the cursor on screen
    let height = area.height as usize;
    let skip = cursor_line.saturating_sub(height.saturating_sub(1));
    let lines: Vec<Line> = lines.into_iter().skip(skip).collect();

    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(theme::muted());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_result(f: &mut Frame, area: Rect, app: &AppState) {
    let queries = &app.queries;
    let mut lines: Vec<Line> = Vec::new();

    if let Some(entry) = queries.selected() {
        lines.push(Line::from(Span::styled(entry.title, theme::accent_bold())));
        lines.push(Line::from(Span::styled(entry.sql, theme::muted())));
        lines.push(Line::from(Span::styled(
            "[Enter]run [n/p]page",
            theme::muted(),
        )));
        lines.push(Line::from(""));
    }

    if queries.running {
        lines.push(Line::from(Span::styled("Running...", theme::neutral())));
    } else {
        match &queries.result {
            Some((key, Ok(result))) => {
                lines.push(Line::from(Span::styled(
                    format!("{key}: {} row(s)", result.rows.len()),
                    theme::positive(),
                )));
                let height = (area.height as usize).saturating_sub(lines.len() + 3).max(1);
                lines.extend(result_lines(result, queries.scroll, height));
            }
            Some((key, Err(err))) => {
                lines.push(Line::from(Span::styled(
                    format!("{key} failed: {err}"),
                    theme::negative(),
                )));
            }
            None => lines.push(Line::from(Span::styled(
                "Select a query and press Enter.",
                theme::muted(),
            ))),
        }
    }

    let inner = Rect {
        x: area.x + 1,
        width: area.width.saturating_sub(1),
        ..area
    };
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}
