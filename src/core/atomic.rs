//! Crash-safe file replacement.
//!
//! Content is staged in a uniquely named sibling, forced to stable storage,
//! then renamed over the destination. A reader racing with a writer only
//! ever observes the fully-old or fully-new file, never a torn write. This
//! module does not serialize writers; callers doing read-modify-write must
//! hold the path's [`LockGuard`](crate::core::lockfile::LockGuard).

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{FileError, Result};

/// Atomically replace `path` with `content`.
///
/// On any failure the destination is untouched and the staging file is
/// cleaned up best-effort by `NamedTempFile`'s drop.
///
/// # Errors
///
/// Returns `FileError` if the staging file cannot be created, written,
/// synced, or renamed into place.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let dir = dir.unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FileError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| FileError::io(tmp.path().to_path_buf(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| FileError::io(tmp.path().to_path_buf(), e))?;

    trace!(dest = %path.display(), bytes = content.len(), "renaming into place");

    tmp.persist(path)
        .map_err(|e| FileError::io(path.to_path_buf(), e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.env");

        write_atomic(&path, "A=1\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\n");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.env");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.env");

        write_atomic(&path, "A=1\n").unwrap();

        let entries: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("out.env")]);
    }

    #[test]
    fn test_write_atomic_failure_leaves_destination_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing-dir").join("out.env");

        // Parent does not exist, so staging fails before any rename.
        assert!(write_atomic(&path, "A=1\n").is_err());
        assert!(!path.exists());
    }
}
