//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here. The worker thread communicates via channels.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crossmarket_runner::catalog::{self, CatalogEntry};
use crossmarket_runner::{AverageSummary, DateRange, PricePoint, QueryResult, TopCoins};

use crate::worker::{WorkerCommand, WorkerResponse};

/// How many coins the selector offers.
pub const TOP_COINS: usize = 3;

/// Which panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Explore,
    Queries,
    Crypto,
    Help,
}

impl Panel {
    const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            Panel::Explore => 0,
            Panel::Queries => 1,
            Panel::Crypto => 2,
            Panel::Help => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Panel::Explore),
            1 => Some(Panel::Queries),
            2 => Some(Panel::Crypto),
            3 => Some(Panel::Help),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Explore => "Explore",
            Panel::Queries => "Queries",
            Panel::Crypto => "Crypto",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Panel::from_index((self.index() + 1) % Self::COUNT).unwrap_or(self)
    }

    pub fn prev(self) -> Panel {
        Panel::from_index((self.index() + Self::COUNT - 1) % Self::COUNT).unwrap_or(self)
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Query,
    Load,
    Input,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Query => "SQL",
            ErrorCategory::Load => "LOAD",
            ErrorCategory::Input => "INPUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

/// The shared date range plus an in-progress edit of one end of it.
#[derive(Debug, Clone, Default)]
pub struct DateRangeEditor {
    pub range: DateRange,
    pub editing: Option<DateField>,
    pub buffer: String,
}

impl DateRangeEditor {
    pub fn begin(&mut self, field: DateField) {
        let current = match field {
            DateField::Start => self.range.start,
            DateField::End => self.range.end,
        };
        self.buffer = current.format("%Y-%m-%d").to_string();
        self.editing = Some(field);
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn push(&mut self, c: char) {
        if (c.is_ascii_digit() || c == '-') && self.buffer.len() < 10 {
            self.buffer.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    pub fn cancel(&mut self) {
        self.editing = None;
        self.buffer.clear();
    }

    /// Apply the buffer. On error the edit stays open.
    pub fn commit(&mut self) -> Result<DateRange, String> {
        let Some(field) = self.editing else {
            return Ok(self.range);
        };
        let date = NaiveDate::parse_from_str(&self.buffer, "%Y-%m-%d")
            .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", self.buffer))?;
        let mut range = self.range;
        match field {
            DateField::Start => range.start = date,
            DateField::End => range.end = date,
        }
        if range.start > range.end {
            return Err(format!("start {} is after end {}", range.start, range.end));
        }
        self.range = range;
        self.cancel();
        Ok(range)
    }
}

/// Explore panel state: averages and the daily snapshot.
#[derive(Debug, Default)]
pub struct ExplorePanelState {
    pub summary: Option<AverageSummary>,
    pub snapshot: Option<QueryResult>,
    pub error: Option<String>,
    pub scroll: usize,
    pub pending: usize,
}

/// Queries panel state: catalog cursor and last result.
#[derive(Debug, Default)]
pub struct QueriesPanelState {
    pub cursor: usize,
    pub result: Option<(String, Result<QueryResult, String>)>,
    pub scroll: usize,
    pub running: bool,
}

impl QueriesPanelState {
    pub fn selected(&self) -> Option<&'static CatalogEntry> {
        catalog::entries().get(self.cursor)
    }

    pub fn select_key(&mut self, key: &str) {
        if let Some(i) = catalog::entries().iter().position(|e| e.key == key) {
            self.cursor = i;
        }
    }
}

/// Crypto panel state: coin selector and one price series.
#[derive(Debug, Default)]
pub struct CryptoPanelState {
    pub top: Option<TopCoins>,
    pub coin_idx: usize,
    /// Coin to select once the choices arrive.
    pub wanted_coin: Option<String>,
    pub series: Option<(String, Result<Vec<PricePoint>, String>)>,
    pub scroll: usize,
    pub loading: bool,
}

impl CryptoPanelState {
    pub fn selected_coin(&self) -> Option<&str> {
        self.top
            .as_ref()
            .and_then(|t| t.coins.get(self.coin_idx))
            .map(|c| c.id.as_str())
    }

    pub fn coin_count(&self) -> usize {
        self.top.as_ref().map_or(0, |t| t.coins.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    ErrorHistory,
}

/// Top-level application state.
pub struct AppState {
    pub active_panel: Panel,
    pub running: bool,

    pub dates: DateRangeEditor,
    pub explore: ExplorePanelState,
    pub queries: QueriesPanelState,
    pub crypto: CryptoPanelState,

    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,

    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,

    pub staging_dir: PathBuf,
    pub db_path: PathBuf,
}

impl AppState {
    pub fn new(
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        staging_dir: PathBuf,
        db_path: PathBuf,
    ) -> Self {
        Self {
            active_panel: Panel::Explore,
            running: true,
            dates: DateRangeEditor::default(),
            explore: ExplorePanelState::default(),
            queries: QueriesPanelState::default(),
            crypto: CryptoPanelState::default(),
            worker_tx,
            worker_rx,
            status_message: None,
            error_history: VecDeque::with_capacity(50),
            error_scroll: 0,
            overlay: Overlay::None,
            staging_dir,
            db_path,
        }
    }

    fn send(&mut self, cmd: WorkerCommand) {
        if self.worker_tx.send(cmd).is_err() {
            self.push_error(
                ErrorCategory::Query,
                "worker thread is gone".into(),
                "send".into(),
            );
        }
    }

    /// Re-run the averages and the daily snapshot for the current range.
    pub fn refresh_explore(&mut self) {
        let range = self.dates.range;
        self.explore.pending = 2;
        self.explore.error = None;
        self.send(WorkerCommand::Summary { range });
        self.send(WorkerCommand::Snapshot { range });
    }

    pub fn run_selected_query(&mut self) {
        if let Some(entry) = self.queries.selected() {
            self.queries.running = true;
            self.set_status(format!("Running: {}", entry.title));
            self.send(WorkerCommand::Catalog {
                key: entry.key.to_string(),
            });
        }
    }

    pub fn request_top_coins(&mut self) {
        self.send(WorkerCommand::TopCoins { n: TOP_COINS });
    }

    pub fn refresh_coin(&mut self) {
        if let Some(coin_id) = self.crypto.selected_coin().map(String::from) {
            self.crypto.loading = true;
            let range = self.dates.range;
            self.send(WorkerCommand::CoinSeries { coin_id, range });
        }
    }

    pub fn reload_from_staging(&mut self) {
        let staging_dir = self.staging_dir.clone();
        self.set_status(format!("Loading tables from {}...", staging_dir.display()));
        self.send(WorkerCommand::LoadStaging { staging_dir });
    }

    /// Refresh whatever the active panel shows for the current range.
    pub fn refresh_active(&mut self) {
        match self.active_panel {
            Panel::Explore => self.refresh_explore(),
            Panel::Crypto => self.refresh_coin(),
            Panel::Queries | Panel::Help => {}
        }
    }

    /// Apply a worker response. Stale range results are dropped.
    pub fn apply_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::Summary { range, result } => {
                if range != self.dates.range {
                    return;
                }
                self.explore.pending = self.explore.pending.saturating_sub(1);
                match result {
                    Ok(summary) => self.explore.summary = Some(summary),
                    Err(e) => {
                        self.explore.summary = None;
                        self.explore.error = Some(e.clone());
                        self.push_error(ErrorCategory::Query, e, "average summary".into());
                    }
                }
            }
            WorkerResponse::Snapshot { range, result } => {
                if range != self.dates.range {
                    return;
                }
                self.explore.pending = self.explore.pending.saturating_sub(1);
                self.explore.scroll = 0;
                match result {
                    Ok(snapshot) => self.explore.snapshot = Some(snapshot),
                    Err(e) => {
                        self.explore.snapshot = None;
                        self.explore.error = Some(e.clone());
                        self.push_error(ErrorCategory::Query, e, "daily snapshot".into());
                    }
                }
            }
            WorkerResponse::Catalog { key, result } => {
                self.queries.running = false;
                self.queries.scroll = 0;
                match &result {
                    Ok(r) => self.set_status(format!("{key}: {} row(s)", r.rows.len())),
                    Err(e) => self.push_error(ErrorCategory::Query, e.clone(), key.clone()),
                }
                self.queries.result = Some((key, result));
            }
            WorkerResponse::TopCoins(top) => {
                if let Some(reason) = &top.reason {
                    self.set_warning(format!("Using fallback coin list: {reason}"));
                }
                let wanted = self
                    .crypto
                    .wanted_coin
                    .take()
                    .or_else(|| self.crypto.selected_coin().map(String::from));
                self.crypto.coin_idx = wanted
                    .and_then(|id| top.coins.iter().position(|c| c.id == id))
                    .unwrap_or(0);
                self.crypto.top = Some(top);
                self.refresh_coin();
            }
            WorkerResponse::CoinSeries {
                coin_id,
                range,
                result,
            } => {
                if range != self.dates.range || self.crypto.selected_coin() != Some(coin_id.as_str()) {
                    return;
                }
                self.crypto.loading = false;
                self.crypto.scroll = 0;
                if let Err(e) = &result {
                    self.push_error(ErrorCategory::Query, e.clone(), coin_id.clone());
                }
                self.crypto.series = Some((coin_id, result));
            }
            WorkerResponse::Loaded { tables } => {
                let failed: Vec<String> = tables
                    .iter()
                    .filter_map(|(table, r)| r.as_ref().err().map(|e| format!("{table}: {e}")))
                    .collect();
                if failed.is_empty() {
                    let rows: usize = tables.iter().filter_map(|(_, r)| r.as_ref().ok()).sum();
                    self.set_status(format!("Loaded {} tables, {rows} rows", tables.len()));
                } else {
                    for f in &failed {
                        self.push_error(ErrorCategory::Load, f.clone(), "load".into());
                    }
                    self.set_warning(format!("{} table(s) failed to load", failed.len()));
                }
                self.request_top_coins();
                self.refresh_explore();
            }
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        tracing::warn!(category = category.label(), %context, "{message}");
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > 50 {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}
