//! Crossmarket TUI: four-panel terminal interface over the loaded store.
//!
//! Panels:
//! 1. Explore: range averages and the daily cross-market snapshot
//! 2. Queries: the predefined analysis catalog
//! 3. Crypto: top-coin selector with a price chart
//! 4. Help: keyboard shortcuts and error history

mod app;
mod input;
mod persistence;
mod theme;
mod ui;
mod worker;

use std::fs::File;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crossmarket_core::config::PipelineConfig;

use crate::app::AppState;
use crate::worker::WorkerCommand;

/// Config read from the working directory when present.
const CONFIG_FILE: &str = "crossmarket.toml";

fn main() -> Result<()> {
    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let app_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crossmarket");
    let state_path = app_dir.join("state.json");
    init_logging(&app_dir);

    let config = load_config()?;
    let persisted = persistence::load(&state_path);

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(config.paths.database.clone(), cmd_rx, resp_tx)
        .context("failed to spawn worker thread")?;

    let mut app = AppState::new(
        cmd_tx.clone(),
        resp_rx,
        config.paths.staging_dir.clone(),
        config.paths.database.clone(),
    );
    persistence::apply(&mut app, persisted);

    // Initial data; the coin series follows once the choices arrive.
    app.request_top_coins();
    app.refresh_explore();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Save state before exit
    let persisted = persistence::extract(&app);
    if let Err(e) = persistence::save(&state_path, &persisted) {
        tracing::warn!(path = %state_path.display(), error = %e, "failed to save state");
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker_handle.join();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn load_config() -> Result<PipelineConfig> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        PipelineConfig::from_file(path).with_context(|| format!("failed to load {CONFIG_FILE}"))
    } else {
        Ok(PipelineConfig::default())
    }
}

/// Log to a file; stderr belongs to the terminal UI.
fn init_logging(dir: &Path) {
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }
    let Ok(file) = File::create(dir.join("crossmarket.log")) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Render
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.apply_response(resp);
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        if !app.running {
            break;
        }
    }
    Ok(())
}
