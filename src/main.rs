mod app;
mod domain;
mod storage;
mod store;
mod ui;
mod usecase;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use app::App;
use domain::task::{Task, TaskId};
use storage::memory::MemoryStorage;
use storage::sqlite::SqliteStorage;
use storage::{KeyValueStorage, STORAGE_KEY};
use store::TaskStore;
use store::persist::TaskPersistence;

/// Same order of magnitude as a browser's per-origin local storage.
const MEMORY_QUOTA: usize = 5 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about = "focusflow: a small persistent task list", long_about = None)]
struct Args {
    /// Tick interval of render loop in milliseconds
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Start with demo tasks (in-memory, nothing is saved)
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Use in-memory storage instead of SQLite
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Path to SQLite storage file (default: OS data dir)
    #[arg(long, env = "FOCUSFLOW_DB")]
    db_path: Option<PathBuf>,

    /// Write logs to this file; filter with RUST_LOG
    #[arg(long, env = "FOCUSFLOW_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let storage: Box<dyn KeyValueStorage> = if args.demo {
        Box::new(demo_storage()?)
    } else if args.memory {
        Box::new(MemoryStorage::default().with_quota(MEMORY_QUOTA))
    } else if let Some(path) = args.db_path.as_ref() {
        Box::new(SqliteStorage::open(path)?)
    } else {
        Box::new(SqliteStorage::open_default()?)
    };

    let app = App::new(TaskStore::new(TaskPersistence::new(storage)));
    ui::run(app, Duration::from_millis(args.tick_ms))
}

/// The terminal belongs to the UI, so logs only go to a file, and only when
/// one is configured.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();
    Ok(())
}

fn demo_storage() -> Result<MemoryStorage> {
    let mut done = Task::new(TaskId::generate(), "Water the plants");
    done.completed = true;
    let seed = vec![
        Task::new(TaskId::generate(), "Write documentation"),
        Task::new(TaskId::generate(), "Check PRs waiting for review"),
        done,
    ];
    let raw = serde_json::to_string(&seed).context("failed to encode demo tasks")?;
    Ok(MemoryStorage::default()
        .with_item(STORAGE_KEY, raw)
        .with_quota(MEMORY_QUOTA))
}
