//! Brewsync - keeps a recipe document store in step with BeerSmith exports.
//!
//! One invocation runs one pass: a pull that replays the BeerSmith archive
//! from the saved cursor, or a rebuild from the full recipe export.

mod config;
mod error;
mod storage;

use crate::config::{Config, Mode};
use crate::error::Result;
use crate::storage::{DirSource, FileCursor, FileStore};
use brewsync_engine::{SyncReport, Synchronizer, Timestamp};
use chrono::Utc;
use std::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brewsync=info,brewsync_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Syncing {} from {}",
        config.collection,
        config.export_path.display()
    );

    match run(&config, Utc::now())? {
        SyncReport::Pull(report) => {
            if report.rebuild_pending {
                tracing::warn!("Rebuild pending; the next run will rebuild the store");
            } else if report.outcome.rebuild_requested() {
                tracing::warn!("Archive replay stopped early; run with BREWSYNC_MODE=rebuild");
            }
        }
        SyncReport::Rebuild(report) => {
            tracing::info!("Rebuilt {} recipes", report.stored);
        }
    }

    Ok(())
}

/// Run one pass against the configured files.
fn run(config: &Config, now: Timestamp) -> Result<SyncReport> {
    fs::create_dir_all(&config.data_dir)?;

    let store = FileStore::open(config.store_path())?;
    let cursor = FileCursor::open(config.cursor_path())?;
    let source = DirSource::new(&config.export_path);
    let mut sync = Synchronizer::new(store, cursor, source, config.sync_options());

    let report = match config.mode {
        Mode::Auto => sync.sync(now, config.overrides())?,
        Mode::Pull => SyncReport::Pull(sync.pull(config.overrides())?),
        Mode::Rebuild => SyncReport::Rebuild(sync.rebuild(now)?),
    };

    let (store, _) = sync.into_parts();
    tracing::debug!(writes = store.writes(), "store snapshot written");

    Ok(report)
}
