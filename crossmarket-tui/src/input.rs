//! Keyboard input dispatch: overlays → date editor → global keys → panel handlers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crossmarket_runner::catalog;

use crate::app::{AppState, DateField, ErrorCategory, Overlay, Panel};

/// Rows moved by PageUp/PageDown in result tables.
const PAGE: usize = 10;

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    if app.overlay == Overlay::ErrorHistory {
        handle_error_overlay(app, key);
        return;
    }

    // 2. An open date edit takes every key.
    if app.dates.is_editing() {
        handle_date_edit(app, key);
        return;
    }

    // 3. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='4') => {
            let idx = c as usize - '1' as usize;
            if let Some(panel) = Panel::from_index(idx) {
                app.active_panel = panel;
            }
            return;
        }
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_panel = app.active_panel.prev();
            } else {
                app.active_panel = app.active_panel.next();
            }
            return;
        }
        KeyCode::BackTab => {
            app.active_panel = app.active_panel.prev();
            return;
        }
        KeyCode::Char('L') => {
            app.reload_from_staging();
            return;
        }
        _ => {}
    }

    // 4. Panel-specific keys.
    match app.active_panel {
        Panel::Explore => handle_explore_key(app, key),
        Panel::Queries => handle_queries_key(app, key),
        Panel::Crypto => handle_crypto_key(app, key),
        Panel::Help => handle_help_key(app, key),
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_date_edit(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.dates.cancel(),
        KeyCode::Backspace => app.dates.backspace(),
        KeyCode::Enter => match app.dates.commit() {
            Ok(range) => {
                app.set_status(format!("Range {} .. {}", range.start, range.end));
                app.refresh_active();
            }
            Err(e) => app.push_error(ErrorCategory::Input, e, "date range".into()),
        },
        KeyCode::Char(c) => app.dates.push(c),
        _ => {}
    }
}

/// Keys shared by panels that follow the date range.
fn handle_range_key(app: &mut AppState, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('s') => app.dates.begin(DateField::Start),
        KeyCode::Char('e') => app.dates.begin(DateField::End),
        KeyCode::Char('r') => app.refresh_active(),
        _ => return false,
    }
    true
}

fn handle_explore_key(app: &mut AppState, key: KeyEvent) {
    if handle_range_key(app, key) {
        return;
    }
    let rows = app.explore.snapshot.as_ref().map_or(0, |s| s.rows.len());
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.explore.scroll + 1 < rows {
                app.explore.scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.explore.scroll = app.explore.scroll.saturating_sub(1);
        }
        KeyCode::PageDown => {
            app.explore.scroll = (app.explore.scroll + PAGE).min(rows.saturating_sub(1));
        }
        KeyCode::PageUp => {
            app.explore.scroll = app.explore.scroll.saturating_sub(PAGE);
        }
        _ => {}
    }
}

fn handle_queries_key(app: &mut AppState, key: KeyEvent) {
    let count = catalog::entries().len();
    let rows = match &app.queries.result {
        Some((_, Ok(r))) => r.rows.len(),
        _ => 0,
    };
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.queries.cursor + 1 < count {
                app.queries.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.queries.cursor = app.queries.cursor.saturating_sub(1);
        }
        KeyCode::Enter => app.run_selected_query(),
        KeyCode::Char('n') | KeyCode::PageDown => {
            app.queries.scroll = (app.queries.scroll + PAGE).min(rows.saturating_sub(1));
        }
        KeyCode::Char('p') | KeyCode::PageUp => {
            app.queries.scroll = app.queries.scroll.saturating_sub(PAGE);
        }
        _ => {}
    }
}

fn handle_crypto_key(app: &mut AppState, key: KeyEvent) {
    if handle_range_key(app, key) {
        return;
    }
    let coins = app.crypto.coin_count();
    let rows = match &app.crypto.series {
        Some((_, Ok(points))) => points.len(),
        _ => 0,
    };
    match key.code {
        KeyCode::Char('l') | KeyCode::Right => {
            if coins > 0 {
                app.crypto.coin_idx = (app.crypto.coin_idx + 1) % coins;
                app.refresh_coin();
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            if coins > 0 {
                app.crypto.coin_idx = (app.crypto.coin_idx + coins - 1) % coins;
                app.refresh_coin();
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.crypto.scroll + 1 < rows {
                app.crypto.scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.crypto.scroll = app.crypto.scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_help_key(app: &mut AppState, key: KeyEvent) {
    if key.code == KeyCode::Char('e') {
        app.error_scroll = 0;
        app.overlay = Overlay::ErrorHistory;
    }
}
