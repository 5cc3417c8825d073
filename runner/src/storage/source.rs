//! Export files read from a directory.

use brewsync_engine::ExportSource;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Reads export files by name from one directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExportSource for DirSource {
    fn read_to_string(&self, name: &str) -> io::Result<String> {
        // exports are not always valid UTF-8
        let bytes = fs::read(self.root.join(name))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
