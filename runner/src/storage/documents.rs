//! Document store persisted as a snapshot file.

use super::write_atomic;
use brewsync_engine::error::Result;
use brewsync_engine::{Document, DocumentStore, Error, MemoryStore, RecipeId, StoreSnapshot};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A [`MemoryStore`] written back to disk after every mutation.
///
/// Batches from [`DocumentStore::upsert_many`] are written once.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    writes: usize,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = match fs::read_to_string(&path) {
            Ok(json) => MemoryStore::from(StoreSnapshot::from_json(&json)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => MemoryStore::new(),
            Err(e) => return Err(store_error(&path, e)),
        };

        tracing::debug!(path = %path.display(), documents = inner.len(), "opened store");
        Ok(Self {
            path,
            inner,
            writes: 0,
        })
    }

    /// Snapshot writes since the store was opened.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn persist(&mut self) -> Result<()> {
        let json = self.inner.export_state().to_json_pretty()?;
        write_atomic(&self.path, &json).map_err(|e| store_error(&self.path, e))?;
        self.writes += 1;
        Ok(())
    }
}

fn store_error(path: &Path, e: io::Error) -> Error {
    Error::Store(format!("{}: {}", path.display(), e))
}

impl DocumentStore for FileStore {
    fn upsert(&mut self, id: &str, document: Document) -> Result<Document> {
        let document = self.inner.upsert(id, document)?;
        self.persist()?;
        Ok(document)
    }

    fn upsert_many(&mut self, documents: Vec<(RecipeId, Document)>) -> Result<usize> {
        let written = self.inner.upsert_many(documents)?;
        if written > 0 {
            self.persist()?;
        }
        Ok(written)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let existed = self.inner.delete(id)?;
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    fn drop_all(&mut self) -> Result<()> {
        self.inner.drop_all()?;
        self.persist()
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    fn find_one(&self, id: &str) -> Result<Option<Document>> {
        self.inner.find_one(id)
    }

    fn find(&self, filter: &Map<String, Value>) -> Result<Vec<Document>> {
        self.inner.find(filter)
    }
}
