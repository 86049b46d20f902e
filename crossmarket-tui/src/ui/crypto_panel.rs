//! Crypto panel (3): top-coin selector, price line chart, and price table.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};

use crossmarket_runner::PricePoint;
use crossmarket_runner::query::format_average;

use crate::app::AppState;
use crate::theme;
use crate::ui::range_line;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(60),
            Constraint::Min(3),
        ])
        .split(area);

    render_header(f, rows[0], app);

    match &app.crypto.series {
        Some((coin_id, Ok(points))) if !points.is_empty() => {
            render_chart(f, rows[1], coin_id, points);
            render_table(f, rows[2], points, app.crypto.scroll);
        }
        Some((coin_id, Ok(_))) => {
            let msg = format!("No price data for {coin_id} in this range.");
            f.render_widget(Paragraph::new(Span::styled(msg, theme::warning())), rows[1]);
        }
        Some((coin_id, Err(err))) => {
            let msg = format!("Could not load {coin_id}: {err}");
            f.render_widget(Paragraph::new(Span::styled(msg, theme::negative())), rows[1]);
        }
        None => {
            let msg = if app.crypto.loading { "Loading..." } else { "No coin selected." };
            f.render_widget(Paragraph::new(Span::styled(msg, theme::muted())), rows[1]);
        }
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let mut coins: Vec<Span> = vec![Span::styled("Coin: ", theme::muted())];
    match &app.crypto.top {
        Some(top) => {
            for (i, coin) in top.coins.iter().enumerate() {
                let style = if i == app.crypto.coin_idx {
                    theme::cursor()
                } else {
                    theme::secondary()
                };
                coins.push(Span::styled(format!(" {} ", coin.name), style));
                coins.push(Span::raw(" "));
            }
            if top.is_fallback() {
                coins.push(Span::styled("(fallback list)", theme::warning()));
            }
        }
        None => coins.push(Span::styled("loading...", theme::neutral())),
    }
    coins.push(Span::styled("  [h/l]coin", theme::muted()));

    let lines = vec![range_line(app), Line::from(coins)];
    f.render_widget(Paragraph::new(lines), area);
}

fn render_chart(f: &mut Frame, area: Rect, coin_id: &str, points: &[PricePoint]) {
    let (min_y, max_y) = price_range(points);
    let [y_min, y_max] = y_bounds(min_y, max_y);
    let x_max = points.len().saturating_sub(1) as f64;

    let data: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.price_usd))
        .collect();

    let dataset = Dataset::default()
        .name(coin_id)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(theme::ACCENT))
        .graph_type(GraphType::Line)
        .data(&data);

    let first = points.first().map(|p| p.date.to_string()).unwrap_or_default();
    let last = points.last().map(|p| p.date.to_string()).unwrap_or_default();

    let chart = Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .title(Span::styled("Date", theme::muted()))
                .style(theme::muted())
                .bounds([0.0, x_max.max(1.0)])
                .labels(vec![
                    Span::styled(first, theme::muted()),
                    Span::styled(last, theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("Price", theme::muted()))
                .style(theme::muted())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(format_average(Some(min_y), false), theme::muted()),
                    Span::styled(format_average(Some(max_y), false), theme::muted()),
                ]),
        );

    f.render_widget(chart, area);
}

fn price_range(points: &[PricePoint]) -> (f64, f64) {
    let min_y = points.iter().map(|p| p.price_usd).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.price_usd).fold(f64::NEG_INFINITY, f64::max);
    (min_y, max_y)
}

/// Axis bounds with 5% headroom; a flat series gets 1% of its level (at least 1.0).
fn y_bounds(min_y: f64, max_y: f64) -> [f64; 2] {
    let span = (max_y - min_y).abs();
    let padding = if span > 0.0 {
        span * 0.05
    } else {
        (max_y.abs() * 0.01).max(1.0)
    };
    [min_y - padding, max_y + padding]
}

fn render_table(f: &mut Frame, area: Rect, points: &[PricePoint], scroll: usize) {
    let mut lines = vec![Line::from(Span::styled(
        format!("{:<12} {:>18}", "date", "price"),
        theme::accent_bold(),
    ))];
    let height = (area.height as usize).saturating_sub(1);
    for p in points.iter().skip(scroll).take(height) {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12} ", p.date), theme::muted()),
            Span::raw(format!("{:>18}", format_average(Some(p.price_usd), false))),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn flat(price: f64, days: u32) -> Vec<PricePoint> {
        (1..=days)
            .map(|d| PricePoint {
                date: NaiveDate::from_ymd_opt(2025, 2, d).unwrap(),
                price_usd: price,
            })
            .collect()
    }

    #[test]
    fn flat_series_still_has_height() {
        for days in [1, 3] {
            let (min_y, max_y) = price_range(&flat(8_000_000.0, days));
            let [lo, hi] = y_bounds(min_y, max_y);
            assert!(lo < 8_000_000.0 && hi > 8_000_000.0, "{lo}..{hi}");
        }
        let [lo, hi] = y_bounds(0.0, 0.0);
        assert_eq!([lo, hi], [-1.0, 1.0]);
    }

    #[test]
    fn moving_series_pads_by_its_span() {
        let [lo, hi] = y_bounds(100.0, 200.0);
        assert_eq!([lo, hi], [95.0, 205.0]);
    }
}
