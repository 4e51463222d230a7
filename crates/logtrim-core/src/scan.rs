//! Recursive discovery of managed log files.
//!
//! # Design
//! - Unreadable entries are skipped; a single bad entry never aborts a scan.
//! - Only regular files are classified. Symlinks are not followed.
//! - Records are deduplicated by path across all configured roots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::classify::is_managed_log;
use crate::model::LogFileRecord;

/// Discover every managed log file beneath `root`, at any depth.
#[must_use]
pub fn scan_root(root: &Path) -> Vec<LogFileRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    collect_root(root, &mut seen, &mut records);
    records
}

/// Discover managed log files beneath every root. A file reachable from more
/// than one root is reported once, owned by the first root that reached it.
#[must_use]
pub fn scan_roots(roots: &[PathBuf]) -> Vec<LogFileRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for root in roots {
        collect_root(root, &mut seen, &mut records);
    }
    records
}

fn collect_root(root: &Path, seen: &mut HashSet<PathBuf>, records: &mut Vec<LogFileRecord>) {
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(
                    error = %err,
                    root = %root.display(),
                    "skipping unreadable entry during scan"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_managed_log(name) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!(
                    error = %err,
                    path = %entry.path().display(),
                    "skipping log file without readable metadata"
                );
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                debug!(
                    error = %err,
                    path = %entry.path().display(),
                    "skipping log file without modification time"
                );
                continue;
            }
        };

        let path = absolute(entry.path());
        if !seen.insert(path.clone()) {
            continue;
        }
        records.push(LogFileRecord {
            path,
            modified_at: DateTime::<Utc>::from(modified),
            size_bytes: Some(metadata.len()),
            owner: root.to_path_buf(),
        });
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
