//! Document store and sync cursor interfaces.
//!
//! The engine never persists anything itself. It drives a [`DocumentStore`]
//! holding one document per recipe, keyed by recipe name, and a
//! [`CursorStore`] remembering how far the archive has been replayed.
//! Each mutation is expected to be atomic per document; nothing here spans
//! several documents.

use crate::snapshot::StoreSnapshot;
use crate::{error::Result, RecipeId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A stored document.
pub type Document = Value;

/// Identity-keyed document persistence.
pub trait DocumentStore {
    /// Insert or replace the document stored under `id`, returning it.
    fn upsert(&mut self, id: &str, document: Document) -> Result<Document>;

    /// Upsert a batch of documents in order, returning how many were
    /// written. Stores with per-write costs override this to pay them once.
    fn upsert_many(&mut self, documents: Vec<(RecipeId, Document)>) -> Result<usize> {
        let written = documents.len();
        for (id, document) in documents {
            self.upsert(&id, document)?;
        }
        Ok(written)
    }

    /// Remove the document stored under `id`. Returns whether one existed.
    fn delete(&mut self, id: &str) -> Result<bool>;

    /// Remove every document.
    fn drop_all(&mut self) -> Result<()>;

    fn count(&self) -> Result<usize>;

    fn find_one(&self, id: &str) -> Result<Option<Document>>;

    /// Documents whose top-level fields equal every field of `filter`.
    fn find(&self, filter: &Map<String, Value>) -> Result<Vec<Document>>;
}

/// Replay progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCursor {
    /// Date of the last archive entry applied.
    pub last_updated: Option<Timestamp>,
    /// Name of the last recipe applied.
    pub last_id: Option<RecipeId>,
    /// Whether the store must be rebuilt from a full export.
    pub rebuild: bool,
}

/// Persisted [`SyncCursor`].
///
/// Setters change a working copy; nothing is durable until [`commit`].
///
/// [`commit`]: CursorStore::commit
pub trait CursorStore {
    fn get(&self) -> Result<SyncCursor>;

    fn set_last_updated(&mut self, at: Timestamp);

    fn set_last_id(&mut self, id: &str);

    fn set_rebuild(&mut self, rebuild: bool);

    fn commit(&mut self) -> Result<()>;

    /// Forget the cursor entirely, committed state included.
    fn delete(&mut self) -> Result<()>;
}

/// Does `document` match every field of `filter`?
pub fn matches_filter(document: &Document, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

/// In-memory document store.
///
/// Documents are kept in id order so exports are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    documents: BTreeMap<RecipeId, Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecipeId> {
        self.documents.keys()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Export the current documents as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        for (id, document) in &self.documents {
            snapshot.add_document(id.clone(), document.clone());
        }
        snapshot
    }

    /// Replace the current documents with a snapshot's.
    pub fn import_state(&mut self, snapshot: StoreSnapshot) {
        self.documents = snapshot.documents;
    }
}

impl From<StoreSnapshot> for MemoryStore {
    fn from(snapshot: StoreSnapshot) -> Self {
        Self {
            documents: snapshot.documents,
        }
    }
}

impl DocumentStore for MemoryStore {
    fn upsert(&mut self, id: &str, document: Document) -> Result<Document> {
        self.documents.insert(id.to_string(), document.clone());
        Ok(document)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        Ok(self.documents.remove(id).is_some())
    }

    fn drop_all(&mut self) -> Result<()> {
        self.documents.clear();
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.documents.len())
    }

    fn find_one(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.get(id).cloned())
    }

    fn find(&self, filter: &Map<String, Value>) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .values()
            .filter(|document| matches_filter(document, filter))
            .cloned()
            .collect())
    }
}

/// In-memory cursor with separate working and committed copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCursor {
    working: SyncCursor,
    committed: SyncCursor,
    commits: usize,
}

impl MemoryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already committed cursor.
    pub fn with_committed(cursor: SyncCursor) -> Self {
        Self {
            working: cursor.clone(),
            committed: cursor,
            commits: 0,
        }
    }

    /// The last committed state.
    pub fn committed(&self) -> &SyncCursor {
        &self.committed
    }

    /// How many times [`CursorStore::commit`] was called.
    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

impl CursorStore for MemoryCursor {
    fn get(&self) -> Result<SyncCursor> {
        Ok(self.working.clone())
    }

    fn set_last_updated(&mut self, at: Timestamp) {
        self.working.last_updated = Some(at);
    }

    fn set_last_id(&mut self, id: &str) {
        self.working.last_id = Some(id.to_string());
    }

    fn set_rebuild(&mut self, rebuild: bool) {
        self.working.rebuild = rebuild;
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = self.working.clone();
        self.commits += 1;
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        self.working = SyncCursor::default();
        self.committed = SyncCursor::default();
        Ok(())
    }
}
