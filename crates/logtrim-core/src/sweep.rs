//! Removal of empty date directories (`20YY-MM-DD`) left behind after a run.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

static DATE_DIR: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^20\d{2}-\d{2}-\d{2}$").ok());

fn is_date_dir_name(name: &str) -> bool {
    DATE_DIR.as_ref().is_some_and(|pattern| pattern.is_match(name))
}

/// Remove empty date-named directories beneath `root`, deepest first, so a
/// chain of nested empty date directories collapses in one pass. The root
/// itself is never removed. Returns the number of directories removed.
#[must_use]
pub fn sweep_empty_date_dirs(root: &Path) -> usize {
    let mut removed = 0usize;

    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    error = %err,
                    root = %root.display(),
                    "failed to traverse sweep root"
                );
                continue;
            }
        };
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        if !entry.file_name().to_str().is_some_and(is_date_dir_name) {
            continue;
        }

        let is_empty = match entry.path().read_dir() {
            Ok(mut iter) => iter.next().is_none(),
            Err(err) => {
                warn!(
                    error = %err,
                    path = %entry.path().display(),
                    "failed to read sweep directory"
                );
                false
            }
        };
        if !is_empty {
            continue;
        }
        match fs::remove_dir(entry.path()) {
            Ok(()) => {
                info!(path = %entry.path().display(), "removed empty date directory");
                removed += 1;
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = %entry.path().display(),
                    "failed to remove empty date directory"
                );
            }
        }
    }

    removed
}
