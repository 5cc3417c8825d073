//! Sync cursor persisted as a JSON file.

use super::write_atomic;
use brewsync_engine::error::Result;
use brewsync_engine::{CursorStore, Error, SyncCursor, Timestamp};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cursor whose setters change a working copy that `commit` writes out.
#[derive(Debug)]
pub struct FileCursor {
    path: PathBuf,
    working: SyncCursor,
}

impl FileCursor {
    /// Open the cursor at `path`; a missing file is a fresh cursor.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let working = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Cursor(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => SyncCursor::default(),
            Err(e) => return Err(cursor_error(&path, e)),
        };

        Ok(Self { path, working })
    }
}

fn cursor_error(path: &Path, e: io::Error) -> Error {
    Error::Cursor(format!("{}: {}", path.display(), e))
}

impl CursorStore for FileCursor {
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
        let json = serde_json::to_string_pretty(&self.working)
            .map_err(|e| Error::Cursor(e.to_string()))?;
        write_atomic(&self.path, &json).map_err(|e| cursor_error(&self.path, e))
    }

    fn delete(&mut self) -> Result<()> {
        self.working = SyncCursor::default();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(cursor_error(&self.path, e)),
        }
    }
}
