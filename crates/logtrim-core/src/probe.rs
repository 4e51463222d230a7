//! Live filesystem usage sampling.

use std::path::Path;

use nix::sys::statvfs::statvfs;

use crate::error::{RetentionError, RetentionResult};
use crate::model::DiskSnapshot;

/// Capability returning the current usage of the filesystem containing a directory.
///
/// Implementations must query the filesystem on every call; the threshold
/// policy depends on observing the effect of each deletion.
pub trait DiskProbe {
    /// Sample usage for the filesystem backing `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the filesystem cannot be statted. Callers treat
    /// this as "usage unknown", never as 0% or 100%.
    fn snapshot(&self, dir: &Path) -> RetentionResult<DiskSnapshot>;
}

impl<T: DiskProbe + ?Sized> DiskProbe for &T {
    fn snapshot(&self, dir: &Path) -> RetentionResult<DiskSnapshot> {
        (**self).snapshot(dir)
    }
}

/// Probe backed by the `statvfs` syscall.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

impl DiskProbe for StatvfsProbe {
    fn snapshot(&self, dir: &Path) -> RetentionResult<DiskSnapshot> {
        let stat = statvfs(dir).map_err(|source| RetentionError::nix("statvfs", dir, source))?;

        let fragment = u64::from(stat.fragment_size());
        let blocks = u64::from(stat.blocks());
        let blocks_free = u64::from(stat.blocks_free());
        let blocks_available = u64::from(stat.blocks_available());

        let total = blocks.saturating_mul(fragment);
        let used = blocks.saturating_sub(blocks_free).saturating_mul(fragment);
        let free = blocks_available.saturating_mul(fragment);

        DiskSnapshot::from_bytes(total, used, free).ok_or_else(|| RetentionError::Unsupported {
            operation: "statvfs",
            value: Some(dir.display().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use logtrim_test_support::LogTree;

    #[test]
    fn statvfs_probe_reports_consistent_snapshot() -> Result<()> {
        let tree = LogTree::new()?;
        let snapshot = StatvfsProbe.snapshot(tree.root())?;
        assert!(snapshot.total_bytes > 0);
        assert!(snapshot.used_bytes <= snapshot.total_bytes);
        assert!(snapshot.free_bytes <= snapshot.total_bytes);
        assert!((0.0..=100.0).contains(&snapshot.usage_percent));
        Ok(())
    }

    #[test]
    fn statvfs_probe_fails_for_missing_path() -> Result<()> {
        let tree = LogTree::new()?;
        let result = StatvfsProbe.snapshot(&tree.root().join("missing"));
        assert!(matches!(result, Err(RetentionError::Nix { .. })));
        Ok(())
    }
}
