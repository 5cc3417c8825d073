//! Archive replay.
//!
//! Applies archive entries to a document store in file order, advancing
//! the sync cursor after each one. Some changes cannot be replayed
//! incrementally because the archive does not say which stored recipe they
//! came from. When one shows up, replay stops and asks for a rebuild.

use crate::archive::{ArchiveAction, ArchiveEntry};
use crate::export::{ExportReader, ExportSource};
use crate::store::{CursorStore, DocumentStore};
use crate::{error::Result, RecipeId, Timestamp};
use serde::{Deserialize, Serialize};

/// Half-open time window `[start, end)`; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayWindow {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl ReplayWindow {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: Timestamp) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }
}

/// Why replay gave up and asked for a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum RebuildReason {
    /// An edit or move names a recipe the store does not have.
    Renamed { name: String },
    /// A paste may have produced a second recipe with the same name.
    Paste { name: String },
    UnknownAction { action: String, name: String },
}

impl std::fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebuildReason::Renamed { name } => write!(f, "'{}' was renamed", name),
            RebuildReason::Paste { name } => write!(f, "'{}' was pasted", name),
            RebuildReason::UnknownAction { action, name } => {
                write!(f, "unknown action '{}' on '{}'", action, name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplayStatus {
    /// Every entry in the window was handled.
    Completed,
    /// Replay stopped early.
    RebuildRequired(RebuildReason),
}

/// What one replay did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    /// Names of the applied entries, in order.
    pub applied: Vec<RecipeId>,
    /// Entries outside the window or without a readable recipe.
    pub skipped: usize,
    pub status: ReplayStatus,
}

impl ReplayOutcome {
    pub fn rebuild_requested(&self) -> bool {
        matches!(self.status, ReplayStatus::RebuildRequired(_))
    }
}

/// Result of applying a single entry.
enum Step {
    Applied(RecipeId),
    Skipped,
    Abort(RebuildReason),
}

/// Replays archive entries against a store and cursor.
pub struct Replayer<'a, S, C, X> {
    store: &'a mut S,
    cursor: &'a mut C,
    reader: &'a ExportReader<X>,
}

impl<'a, S, C, X> Replayer<'a, S, C, X>
where
    S: DocumentStore,
    C: CursorStore,
    X: ExportSource,
{
    pub fn new(store: &'a mut S, cursor: &'a mut C, reader: &'a ExportReader<X>) -> Self {
        Self {
            store,
            cursor,
            reader,
        }
    }

    /// Apply the entries that fall inside `window`, in order.
    ///
    /// The cursor is committed after every applied entry, so an interrupted
    /// replay resumes from the last entry that finished. When replay stops
    /// for a rebuild, the cursor's rebuild flag is set and committed.
    pub fn replay(&mut self, entries: &[ArchiveEntry], window: &ReplayWindow) -> Result<ReplayOutcome> {
        let mut applied = Vec::new();
        let mut skipped = 0;
        let mut status = ReplayStatus::Completed;

        for entry in entries {
            if !window.contains(entry.date) {
                skipped += 1;
                continue;
            }
            tracing::debug!("[{}] {}: {}", entry.date, entry.name, entry.action);

            match self.apply(entry)? {
                Step::Applied(id) => {
                    self.cursor.set_last_updated(entry.date);
                    self.cursor.set_last_id(&id);
                    self.cursor.commit()?;
                    applied.push(id);
                }
                Step::Skipped => skipped += 1,
                Step::Abort(reason) => {
                    tracing::warn!("replay stopped, rebuild required: {}", reason);
                    status = ReplayStatus::RebuildRequired(reason);
                    break;
                }
            }
        }

        if matches!(status, ReplayStatus::RebuildRequired(_)) {
            self.cursor.set_rebuild(true);
            self.cursor.commit()?;
        }

        Ok(ReplayOutcome {
            applied,
            skipped,
            status,
        })
    }

    fn apply(&mut self, entry: &ArchiveEntry) -> Result<Step> {
        match &entry.action {
            ArchiveAction::AddRecipe | ArchiveAction::InsertPaste => {
                let Some(recipe) = self.read_recipe(entry) else {
                    return Ok(Step::Skipped);
                };
                let id = recipe.id().to_string();
                self.store.upsert(&id, recipe.into_document())?;
                tracing::debug!("\tprocessed: {}", entry.action);
                Ok(Step::Applied(id))
            }
            ArchiveAction::Edit | ArchiveAction::Move => {
                let Some(recipe) = self.read_recipe(entry) else {
                    return Ok(Step::Skipped);
                };
                let id = recipe.id().to_string();
                if self.store.find_one(&id)?.is_none() {
                    return Ok(Step::Abort(RebuildReason::Renamed { name: id }));
                }
                self.store.upsert(&id, recipe.into_document())?;
                tracing::debug!("\tprocessed: {}", entry.action);
                Ok(Step::Applied(id))
            }
            ArchiveAction::DeleteCut => {
                if !self.store.delete(&entry.name)? {
                    tracing::debug!("\t'{}' was not stored", entry.name);
                }
                Ok(Step::Applied(entry.name.clone()))
            }
            ArchiveAction::Paste => Ok(Step::Abort(RebuildReason::Paste {
                name: entry.name.clone(),
            })),
            ArchiveAction::Unknown(action) => Ok(Step::Abort(RebuildReason::UnknownAction {
                action: action.clone(),
                name: entry.name.clone(),
            })),
        }
    }

    fn read_recipe(&self, entry: &ArchiveEntry) -> Option<crate::recipe::Recipe> {
        let recipe = self.reader.read_recipe(&entry.file);
        if recipe.is_none() {
            tracing::warn!(
                file = entry.file.as_str(),
                "no recipe for {} of '{}', skipping",
                entry.action,
                entry.name
            );
        }
        recipe
    }
}
