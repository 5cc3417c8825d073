//! Sync orchestration.
//!
//! A [`Synchronizer`] owns the store, the cursor and the export reader and
//! runs either an incremental pull from the archive or a full rebuild from
//! the base export.

use crate::export::{ExportReader, ExportSource};
use crate::replay::{ReplayOutcome, ReplayWindow, Replayer};
use crate::store::{CursorStore, DocumentStore};
use crate::{error::Result, Timestamp};
use serde::{Deserialize, Serialize};

/// What `pull` does with the persisted rebuild flag after replaying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RebuildFlagPolicy {
    /// Always clear the flag, even when this pull just set it.
    #[default]
    ClearOnPull,
    /// Leave the flag alone; only a rebuild clears it.
    KeepUntilRebuild,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// Full export read by rebuild.
    pub export_file: String,
    /// Archive read by pull.
    pub archive_file: String,
    pub rebuild_flag: RebuildFlagPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            export_file: "Recipe.bsmx".into(),
            archive_file: "Archive.bsmx".into(),
            rebuild_flag: RebuildFlagPolicy::default(),
        }
    }
}

/// Caller overrides for the replay window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOverrides {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullReport {
    pub window: ReplayWindow,
    pub outcome: ReplayOutcome,
    /// Persisted rebuild flag after the pull.
    pub rebuild_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    /// Recipes read from the export and upserted.
    pub processed: usize,
    /// Documents in the store afterwards.
    pub stored: usize,
}

impl RebuildReport {
    pub fn is_consistent(&self) -> bool {
        self.processed == self.stored
    }
}

/// Which pass [`Synchronizer::sync`] ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncReport {
    Pull(PullReport),
    Rebuild(RebuildReport),
}

/// Keeps a document store in step with the exports.
pub struct Synchronizer<S, C, X> {
    store: S,
    cursor: C,
    reader: ExportReader<X>,
    options: SyncOptions,
}

impl<S, C, X> Synchronizer<S, C, X>
where
    S: DocumentStore,
    C: CursorStore,
    X: ExportSource,
{
    pub fn new(store: S, cursor: C, source: X, options: SyncOptions) -> Self {
        Self {
            store,
            cursor,
            reader: ExportReader::new(source),
            options,
        }
    }

    /// Replay the archive from the cursor onwards.
    pub fn pull(&mut self, overrides: WindowOverrides) -> Result<PullReport> {
        let persisted = self.cursor.get()?;
        let window = ReplayWindow::new(
            overrides.start.or(persisted.last_updated),
            overrides.end,
        );
        tracing::debug!("timespan: {:?}, {:?}", window.start, window.end);

        let entries = self.reader.read_archive(&self.options.archive_file);
        let outcome =
            Replayer::new(&mut self.store, &mut self.cursor, &self.reader).replay(&entries, &window)?;

        if self.options.rebuild_flag == RebuildFlagPolicy::ClearOnPull {
            self.cursor.set_rebuild(false);
        }
        self.cursor.commit()?;
        let rebuild_pending = self.cursor.get()?.rebuild;

        tracing::info!(
            applied = outcome.applied.len(),
            skipped = outcome.skipped,
            rebuild_pending,
            "pull finished"
        );

        Ok(PullReport {
            window,
            outcome,
            rebuild_pending,
        })
    }

    /// Drop everything and reload the store from the full export.
    ///
    /// A store count that disagrees with the number of recipes read is
    /// logged, not returned as an error.
    pub fn rebuild(&mut self, now: Timestamp) -> Result<RebuildReport> {
        tracing::debug!("resetting recipe store");
        self.store.drop_all()?;
        self.cursor.delete()?;

        tracing::info!("reading recipes from {}", self.options.export_file);
        let recipes = self.reader.read_recipes(&self.options.export_file);
        let processed = recipes.len();

        let documents: Vec<_> = recipes
            .into_iter()
            .map(|recipe| (recipe.id().to_string(), recipe.into_document()))
            .collect();
        let last_id = documents.last().map(|(id, _)| id.clone());
        let written = self.store.upsert_many(documents)?;
        tracing::debug!(written, "updated recipes");

        if let Some(id) = &last_id {
            self.cursor.set_last_updated(now);
            self.cursor.set_last_id(id);
        }
        self.cursor.set_rebuild(false);
        self.cursor.commit()?;

        let report = RebuildReport {
            processed,
            stored: self.store.count()?,
        };
        if report.is_consistent() {
            tracing::info!(count = report.stored, "recipe store rebuilt");
        } else {
            tracing::warn!(
                processed = report.processed,
                stored = report.stored,
                "recipe store rebuilt, discrepancies found"
            );
        }

        Ok(report)
    }

    /// Rebuild if a rebuild is pending, pull otherwise.
    pub fn sync(&mut self, now: Timestamp, overrides: WindowOverrides) -> Result<SyncReport> {
        if self.cursor.get()?.rebuild {
            tracing::info!("rebuild flag set, rebuilding");
            return self.rebuild(now).map(SyncReport::Rebuild);
        }
        self.pull(overrides).map(SyncReport::Pull)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cursor(&self) -> &C {
        &self.cursor
    }

    /// Give back the store and cursor.
    pub fn into_parts(self) -> (S, C) {
        (self.store, self.cursor)
    }
}
