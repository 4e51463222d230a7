//! Validation of run inputs before any side effect.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RetentionError, RetentionResult};
use crate::model::RetentionPolicy;

const DIRECTORY_SEPARATOR: char = ':';
const MIN_PERCENT: u8 = 1;
const MAX_PERCENT: u8 = 99;

/// Validated inputs for a retention run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionRequest {
    /// Configured roots, canonicalized, in the order given.
    pub roots: Vec<PathBuf>,
    /// Stopping policy.
    pub policy: RetentionPolicy,
}

impl RetentionRequest {
    /// Build a request from a colon-separated directory list and a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::InvalidPolicy`] when the policy percentage is
    /// outside `[1, 99]`, and [`RetentionError::InvalidInput`] when the list is
    /// empty or names a path that is missing or not a directory.
    pub fn parse(directories: &str, policy: RetentionPolicy) -> RetentionResult<Self> {
        validate_percent(policy)?;
        let roots = parse_directories(directories)?;
        Ok(Self { roots, policy })
    }
}

fn validate_percent(policy: RetentionPolicy) -> RetentionResult<()> {
    let field = match policy {
        RetentionPolicy::Quota { .. } => "keep_percent",
        RetentionPolicy::Threshold { .. } => "usage_percent",
    };
    let percent = policy.percent();
    if (MIN_PERCENT..=MAX_PERCENT).contains(&percent) {
        Ok(())
    } else {
        Err(RetentionError::InvalidPolicy {
            field,
            reason: "out_of_range",
            value: Some(percent.to_string()),
        })
    }
}

fn parse_directories(directories: &str) -> RetentionResult<Vec<PathBuf>> {
    let mut roots = Vec::new();
    for entry in directories
        .split(DIRECTORY_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
    {
        let path = Path::new(entry);
        if !path.exists() {
            return Err(RetentionError::InvalidInput {
                field: "directories",
                reason: "not_found",
                value: Some(entry.to_string()),
            });
        }
        if !path.is_dir() {
            return Err(RetentionError::InvalidInput {
                field: "directories",
                reason: "not_a_directory",
                value: Some(entry.to_string()),
            });
        }
        let canonical = fs::canonicalize(path)
            .map_err(|source| RetentionError::io("canonicalize", path, source))?;
        if !roots.contains(&canonical) {
            roots.push(canonical);
        }
    }

    if roots.is_empty() {
        return Err(RetentionError::InvalidInput {
            field: "directories",
            reason: "empty",
            value: Some(directories.to_string()),
        });
    }
    Ok(roots)
}
