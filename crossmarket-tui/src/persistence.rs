//! App state persistence: JSON save/load across restarts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crossmarket_runner::DateRange;

use crate::app::{AppState, Panel};

/// Serializable subset of app state that persists across restarts.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub range: DateRange,
    pub selected_coin: Option<String>,
    pub active_panel: Panel,
    pub query_key: Option<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            selected_coin: None,
            active_panel: Panel::Explore,
            query_key: None,
        }
    }
}

/// Load persisted state from disk. Returns defaults if file is missing or corrupt.
pub fn load(path: &Path) -> PersistedState {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => PersistedState::default(),
    }
}

/// Save persisted state to disk. Creates parent directories if needed.
pub fn save(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn extract(app: &AppState) -> PersistedState {
    PersistedState {
        range: app.dates.range,
        selected_coin: app.crypto.selected_coin().map(String::from),
        active_panel: app.active_panel,
        query_key: app.queries.selected().map(|e| e.key.to_string()),
    }
}

/// Apply persisted state. An inverted range falls back to the default.
pub fn apply(app: &mut AppState, state: PersistedState) {
    app.dates.range = if state.range.start <= state.range.end {
        state.range
    } else {
        DateRange::default()
    };
    app.crypto.wanted_coin = state.selected_coin;
    app.active_panel = state.active_panel;
    if let Some(key) = state.query_key {
        app.queries.select_key(&key);
    }
}
