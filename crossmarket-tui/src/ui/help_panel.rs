//! Help panel (4): keyboard shortcuts and file locations.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global Navigation");
    key(&mut lines, "1-4", "Switch to panel by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, "L", "Reload every table from the staging directory");
    key(&mut lines, "q", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, "Date Range (Explore, Crypto)");
    key(&mut lines, "s / e", "Edit start / end date (YYYY-MM-DD)");
    key(&mut lines, "Enter", "Apply the edit and refresh");
    key(&mut lines, "Esc", "Cancel the edit");
    key(&mut lines, "r", "Refresh for the current range");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 1: Explore");
    key(&mut lines, "j / k", "Scroll the daily snapshot");
    key(&mut lines, "PgUp / PgDn", "Scroll by page");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 2: Queries");
    key(&mut lines, "j / k", "Select a catalog query");
    key(&mut lines, "Enter", "Run the selected query");
    key(&mut lines, "n / p", "Page the result down / up");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 3: Crypto");
    key(&mut lines, "h / l", "Previous / next coin");
    key(&mut lines, "j / k", "Scroll the price table");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 4: Help (this panel)");
    key(&mut lines, "e", "Open error history overlay");
    lines.push(Line::from(""));

    section(&mut lines, "Files");
    key(&mut lines, "staging", &app.staging_dir.display().to_string());
    key(&mut lines, "database", &app.db_path.display().to_string());

    let para = Paragraph::new(lines);
    f.render_widget(para, area);
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'_>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:>20}  ", keys), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
