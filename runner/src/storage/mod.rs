//! File-backed collaborators for the sync engine.

mod cursor;
mod documents;
mod source;

pub use cursor::FileCursor;
pub use documents::FileStore;
pub use source::DirSource;

use std::fs;
use std::io;
use std::path::Path;

/// Replace `path` with `contents` through a sibling temp file and a rename,
/// so readers never see a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
