//! Export: plain-text table, CSV, and JSON renderings of a query result.

use std::path::Path;

use anyhow::{Context, Result};

use crate::query::QueryResult;

/// Output format for a rendered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick a format from a file extension; anything unknown is a table.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Table,
        }
    }
}

pub fn render(result: &QueryResult, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Table => Ok(render_table(result)),
        ExportFormat::Csv => export_csv(result),
        ExportFormat::Json => export_json(result),
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Header row plus one record per row. Nulls are empty fields.
pub fn export_csv(result: &QueryResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&result.columns)?;
    for row in &result.rows {
        wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

/// An array of objects keyed by column name, in column order.
pub fn export_json(result: &QueryResult) -> Result<String> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .cloned()
                .zip(row.iter().map(|c| serde_json::to_value(c).unwrap_or_default()))
                .collect()
        })
        .collect();
    serde_json::to_string_pretty(&records).context("failed to serialize query result to JSON")
}

// ─── Text table ─────────────────────────────────────────────────────

/// Fixed-width table with a header rule; reals print with two decimals.
pub fn render_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return String::from("(no columns)\n");
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(display_cell).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::with_capacity(64 * (cells.len() + 2));
    push_line(&mut out, result.columns.iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &cells {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    if cells.is_empty() {
        out.push_str("(no rows)\n");
    }
    out
}

/// Cell text as the table and the TUI show it.
pub fn display_cell(cell: &crate::query::Cell) -> String {
    match cell {
        crate::query::Cell::Real(x) => format!("{x:.2}"),
        crate::query::Cell::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Write a result to `path`, choosing the format from its extension.
pub fn save(result: &QueryResult, path: &Path) -> Result<()> {
    let body = render(result, ExportFormat::from_path(path))?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
