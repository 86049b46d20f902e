//! Top-level UI layout: four-panel frame with status bar.

pub mod crypto_panel;
pub mod explore_panel;
pub mod help_panel;
pub mod overlays;
pub mod query_panel;
pub mod status_bar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};

use crossmarket_runner::QueryResult;
use crossmarket_runner::export::display_cell;

use crate::app::{AppState, DateField, Overlay, Panel};
use crate::theme;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    // Split: main area + 1-line status bar.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let main_area = chunks[0];
    let status_area = chunks[1];

    draw_panel(f, main_area, app);
    status_bar::render(f, status_area, app);

    if app.overlay == Overlay::ErrorHistory {
        overlays::render_error_history(f, main_area, app);
    }
}

/// Draw a single panel with its border.
fn draw_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let panel = app.active_panel;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(format!(" {} [{}] ", panel.label(), panel.index() + 1))
        .title_style(theme::panel_title(true));

    let inner = block.inner(area);
    f.render_widget(block, area);

    match panel {
        Panel::Explore => explore_panel::render(f, inner, app),
        Panel::Queries => query_panel::render(f, inner, app),
        Panel::Crypto => crypto_panel::render(f, inner, app),
        Panel::Help => help_panel::render(f, inner, app),
    }
}

/// "Range: start .. end" header, showing the edit buffer when one is open.
pub fn range_line(app: &AppState) -> Line<'static> {
    let dates = &app.dates;
    let field = |which: DateField, value: String| -> Span<'static> {
        if dates.editing == Some(which) {
            Span::styled(format!("{}_", dates.buffer), theme::cursor())
        } else {
            Span::styled(value, theme::accent_bold())
        }
    };
    Line::from(vec![
        Span::styled("Range: ", theme::muted()),
        field(DateField::Start, dates.range.start.to_string()),
        Span::styled(" .. ", theme::muted()),
        field(DateField::End, dates.range.end.to_string()),
        Span::styled("  [s]tart [e]nd [r]efresh", theme::muted()),
    ])
}

/// Aligned lines for a result set: header, rule, then `height` rows from `scroll`.
pub fn result_lines(result: &QueryResult, scroll: usize, height: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if result.columns.is_empty() || result.is_empty() {
        lines.push(Line::from(Span::styled("(no rows)", theme::warning())));
        return lines;
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(display_cell).collect())
        .collect();
    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i).map(|cell| cell.chars().count()))
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let join = |values: Vec<String>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    lines.push(Line::from(Span::styled(
        join(result.columns.clone()),
        theme::accent_bold(),
    )));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(Line::from(Span::styled(rule.join("  "), theme::muted())));

    for row in cells.into_iter().skip(scroll).take(height) {
        lines.push(Line::from(Span::raw(join(row))));
    }
    if result.rows.len() > height {
        lines.push(Line::from(Span::styled(
            format!(
                "rows {}-{} of {}",
                scroll + 1,
                (scroll + height).min(result.rows.len()),
                result.rows.len()
            ),
            theme::muted(),
        )));
    }
    lines
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossmarket_runner::Cell;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn empty_result_says_no_rows() {
        let lines = result_lines(&QueryResult::default(), 0, 10);
        assert_eq!(text(&lines[0]), "(no rows)");
    }

    #[test]
    fn columns_are_aligned_and_paged() {
        let result = QueryResult {
            columns: vec!["date".into(), "price".into()],
            rows: (0..5)
                .map(|i| vec![Cell::Text(format!("2025-02-0{}", i + 1)), Cell::Real(i as f64)])
                .collect(),
        };
        let lines = result_lines(&result, 1, 2);
        assert_eq!(text(&lines[0]), "date        price");
        assert_eq!(text(&lines[2]), "2025-02-02  1.00 ");
        assert_eq!(text(&lines[4]), "rows 2-3 of 5");
    }

    #[test]
    fn non_ascii_cells_stay_aligned() {
        let result = QueryResult {
            columns: vec!["name".into(), "price".into()],
            rows: vec![
                vec![Cell::Text("Ñandú coin".into()), Cell::Real(1.0)],
                vec![Cell::Text("BTC".into()), Cell::Real(2.0)],
            ],
        };
        let lines = result_lines(&result, 0, 10);
        assert_eq!(text(&lines[0]), "name        price");
        assert_eq!(text(&lines[2]), "Ñandú coin  1.00 ");
        assert_eq!(text(&lines[3]), "BTC         2.00 ");
    }
}
