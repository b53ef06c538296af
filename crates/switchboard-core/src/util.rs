//! Filesystem helpers shared by the store, backends, and merge writer

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write `content` to `path` atomically
///
/// A concurrent reader sees either the old document or the new one, never a
/// partial write. The temp file is created in the destination directory so
/// the final rename stays on one filesystem.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
