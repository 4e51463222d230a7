//! Test fixtures for building log directories on disk.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

/// A temporary directory populated with files whose modification times are
/// set relative to "now". The directory is removed on drop.
#[derive(Debug)]
pub struct LogTree {
    root: PathBuf,
    _dir: TempDir,
}

impl LogTree {
    /// Create an empty tree in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("logtrim-")
            .tempdir()
            .context("failed to create temporary log tree")?;
        // Resolved so roots compare equal to the canonical paths requests produce.
        let root = fs::canonicalize(dir.path())
            .with_context(|| format!("failed to resolve {}", dir.path().display()))?;
        Ok(Self { root, _dir: dir })
    }

    /// Root of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a directory (and parents) relative to the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn mkdir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root().join(relative);
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(path)
    }

    /// Write `contents` to `relative`, creating parents, and backdate its
    /// modification time by `age`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or its time cannot be set.
    pub fn write_aged(&self, relative: &str, contents: &[u8], age: Duration) -> Result<PathBuf> {
        let modified = SystemTime::now()
            .checked_sub(age)
            .ok_or_else(|| anyhow!("age {age:?} underflows the system clock"))?;
        self.write_at(relative, contents, modified)
    }

    /// Write `contents` to `relative`, creating parents, with an explicit
    /// modification time.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or its time cannot be set.
    pub fn write_at(&self, relative: &str, contents: &[u8], modified: SystemTime) -> Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(modified))
            .with_context(|| format!("failed to set modification time on {}", path.display()))?;
        Ok(path)
    }

    /// Total bytes of regular files currently present beneath the root.
    #[must_use]
    pub fn bytes_present(&self) -> u64 {
        bytes_under(self.root())
    }
}

/// Total bytes of regular files beneath `dir`, recursively. Unreadable entries count as zero.
#[must_use]
pub fn bytes_under(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| match entry.file_type() {
            Ok(kind) if kind.is_dir() => bytes_under(&entry.path()),
            Ok(kind) if kind.is_file() => entry.metadata().map_or(0, |meta| meta.len()),
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_aged_backdates_modification_time() -> Result<()> {
        let tree = LogTree::new()?;
        let path = tree.write_aged("nested/app.log", b"hello", Duration::from_secs(7200))?;
        let modified = fs::metadata(&path)?.modified()?;
        let age = SystemTime::now().duration_since(modified)?;
        assert!(age >= Duration::from_secs(7100));
        assert_eq!(tree.bytes_present(), 5);
        Ok(())
    }

    #[test]
    fn bytes_present_ignores_directories() -> Result<()> {
        let tree = LogTree::new()?;
        tree.mkdir("empty/child")?;
        tree.write_aged("a.log", b"abc", Duration::from_secs(1))?;
        tree.write_aged("empty/b.log", b"de", Duration::from_secs(1))?;
        assert_eq!(tree.bytes_present(), 5);
        Ok(())
    }
}
