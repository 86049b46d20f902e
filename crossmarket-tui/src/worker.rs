//! Background worker thread: owns the `Store` for the whole session.
//!
//! Communication with the TUI main thread is via `mpsc` channels. Commands
//! are served one at a time, in order.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use crossmarket_core::data::StagingDir;
use crossmarket_runner::{
    load_all, AverageSummary, DateRange, PricePoint, QueryResult, QueryRunner, Store, TopCoins,
};

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Summary { range: DateRange },
    Snapshot { range: DateRange },
    Catalog { key: String },
    TopCoins { n: usize },
    CoinSeries { coin_id: String, range: DateRange },
    /// Replace every table from the staging directory.
    LoadStaging { staging_dir: PathBuf },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Summary {
        range: DateRange,
        result: Result<AverageSummary, String>,
    },
    Snapshot {
        range: DateRange,
        result: Result<QueryResult, String>,
    },
    Catalog {
        key: String,
        result: Result<QueryResult, String>,
    },
    TopCoins(TopCoins),
    CoinSeries {
        coin_id: String,
        range: DateRange,
        result: Result<Vec<PricePoint>, String>,
    },
    Loaded {
        /// `(table, rows or failure reason)` per table.
        tables: Vec<(String, Result<usize, String>)>,
    },
}

/// Spawn the background worker thread. The store is opened on the worker.
pub fn spawn_worker(
    db_path: PathBuf,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("crossmarket-worker".into())
        .spawn(move || match Store::open(&db_path) {
            Ok(mut store) => worker_loop(&mut store, rx, tx),
            Err(e) => {
                tracing::error!(path = %db_path.display(), error = %e, "cannot open database");
                unavailable_loop(e.to_string(), rx, tx);
            }
        })
}

fn worker_loop(store: &mut Store, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(cmd) => {
                if let Some(resp) = handle_command(store, cmd) {
                    if tx.send(resp).is_err() {
                        break;
                    }
                }
            }
        }
    }
    tracing::debug!("worker stopped");
}

// Without a store every command fails with the open error.
fn unavailable_loop(message: String, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>) {
    let reason = format!("database unavailable: {message}");
    loop {
        let resp = match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Summary { range }) => WorkerResponse::Summary { range, result: Err(reason.clone()) },
            Ok(WorkerCommand::Snapshot { range }) => WorkerResponse::Snapshot { range, result: Err(reason.clone()) },
            Ok(WorkerCommand::Catalog { key }) => WorkerResponse::Catalog { key, result: Err(reason.clone()) },
            Ok(WorkerCommand::TopCoins { .. }) => {
                WorkerResponse::TopCoins(TopCoins::fallback(reason.clone()))
            }
            Ok(WorkerCommand::CoinSeries { coin_id, range }) => WorkerResponse::CoinSeries {
                coin_id,
                range,
                result: Err(reason.clone()),
            },
            Ok(WorkerCommand::LoadStaging { .. }) => WorkerResponse::Loaded {
                tables: vec![("database".into(), Err(reason.clone()))],
            },
        };
        if tx.send(resp).is_err() {
            break;
        }
    }
}

/// Serve one command against the store.
pub fn handle_command(store: &mut Store, cmd: WorkerCommand) -> Option<WorkerResponse> {
    let resp = match cmd {
        WorkerCommand::Summary { range } => WorkerResponse::Summary {
            range,
            result: QueryRunner::new(store)
                .average_summary(range)
                .map_err(|e| e.message),
        },
        WorkerCommand::Snapshot { range } => WorkerResponse::Snapshot {
            range,
            result: QueryRunner::new(store)
                .daily_snapshot(range)
                .map_err(|e| e.message),
        },
        WorkerCommand::Catalog { key } => {
            let result = QueryRunner::new(store)
                .run_catalog(&key)
                .map(|(_, result)| result)
                .map_err(|e| e.message);
            WorkerResponse::Catalog { key, result }
        }
        WorkerCommand::TopCoins { n } => WorkerResponse::TopCoins(QueryRunner::new(store).top_coins(n)),
        WorkerCommand::CoinSeries { coin_id, range } => {
            let result = QueryRunner::new(store)
                .coin_points(&coin_id, range)
                .map_err(|e| e.message);
            WorkerResponse::CoinSeries {
                coin_id,
                range,
                result,
            }
        }
        WorkerCommand::LoadStaging { staging_dir } => {
            let report = load_all(store, &StagingDir::new(staging_dir));
            let tables = report
                .tables
                .into_iter()
                .map(|t| {
                    (
                        t.dataset.table_name().to_string(),
                        t.result.map_err(|e| e.reason),
                    )
                })
                .collect();
            WorkerResponse::Loaded { tables }
        }
        WorkerCommand::Shutdown => return None,
    };
    Some(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn worker_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, _resp_rx) = mpsc::channel();

        let handle = spawn_worker(dir.path().join("market_data.db"), cmd_rx, resp_tx).unwrap();
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().expect("worker should join cleanly");
    }

    #[test]
    fn commands_are_answered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let handle = spawn_worker(dir.path().join("market_data.db"), cmd_rx, resp_tx).unwrap();

        cmd_tx.send(WorkerCommand::TopCoins { n: 3 }).unwrap();
        cmd_tx
            .send(WorkerCommand::Catalog { key: "oil-min".into() })
            .unwrap();
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();

        match resp_rx.recv().unwrap() {
            WorkerResponse::TopCoins(top) => assert!(top.is_fallback()),
            other => panic!("expected TopCoins, got {other:?}"),
        }
        match resp_rx.recv().unwrap() {
            WorkerResponse::Catalog { key, result } => {
                assert_eq!(key, "oil-min");
                assert!(result.unwrap_err().contains("no such table"));
            }
            other => panic!("expected Catalog, got {other:?}"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn load_from_missing_staging_fails_every_table() {
        let mut store = Store::in_memory().unwrap();
        let resp = handle_command(&mut store, WorkerCommand::LoadStaging {
            staging_dir: PathBuf::from("/nonexistent/staging"),
        });
        match resp {
            Some(WorkerResponse::Loaded { tables }) => {
                assert_eq!(tables.len(), 4);
                assert!(tables.iter().all(|(_, r)| r.is_err()));
            }
            other => panic!("expected Loaded, got {other:?}"),
        }

        // tables still missing, so the summary query errors
        let resp = handle_command(&mut store, WorkerCommand::Summary {
            range: DateRange::default(),
        });
        assert!(matches!(
            resp,
            Some(WorkerResponse::Summary { result: Err(_), .. })
        ));
    }
}
