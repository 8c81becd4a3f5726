//! Write-to-temp-then-rename.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Atomically replace `path` with `bytes`.
///
/// The bytes go to a temporary file in the destination directory, which is
/// renamed over `path` only after a successful flush. If `cancelled` reports
/// true just before the rename, or any step fails, the temporary file is
/// removed and `path` is left as it was.
pub fn write_atomic(path: &Path, bytes: &[u8], cancelled: impl Fn() -> bool) -> Result<u64> {
    if path.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is a directory", path.display()),
        )));
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;

    if cancelled() {
        log::debug!("Export to {} cancelled before commit", path.display());
        return Err(Error::Cancelled);
    }

    file.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();

        let written = write_atomic(&path, b"new contents", || false).unwrap();
        assert_eq!(written, 12);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new contents");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_cancel_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let err = write_atomic(&path, b"data", || true).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        assert!(matches!(write_atomic(&path, b"x", || false), Err(Error::Io(_))));
    }
}
