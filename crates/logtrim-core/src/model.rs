//! Domain models for the retention pipeline.
//!
//! # Design
//! - Records are discovered once per run and never persisted.
//! - Disk snapshots are valid only at the instant they were sampled.
//! - The report is the single mutable accumulator threaded through a run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A classified log file discovered beneath one of the configured roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Modification time observed during the scan.
    pub modified_at: DateTime<Utc>,
    /// Size observed during the scan; re-read before deletion.
    pub size_bytes: Option<u64>,
    /// Configured root the file was found under.
    pub owner: PathBuf,
}

/// Stopping policy for a retention run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep the newest `keep_percent` of candidates and delete the rest.
    Quota {
        /// Share of candidates to keep, in `[1, 99]`.
        keep_percent: u8,
    },
    /// Delete oldest candidates until live disk usage is at or below `usage_percent`.
    Threshold {
        /// Target disk usage, in `[1, 99]`.
        usage_percent: u8,
    },
}

impl RetentionPolicy {
    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quota { .. } => "quota",
            Self::Threshold { .. } => "threshold",
        }
    }

    /// The percentage carried by the policy.
    #[must_use]
    pub const fn percent(self) -> u8 {
        match self {
            Self::Quota { keep_percent } => keep_percent,
            Self::Threshold { usage_percent } => usage_percent,
        }
    }
}

/// Point-in-time capacity of the filesystem backing a directory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskSnapshot {
    /// Filesystem capacity in bytes.
    pub total_bytes: u64,
    /// Bytes in use, including blocks reserved for the superuser.
    pub used_bytes: u64,
    /// Bytes available to unprivileged users.
    pub free_bytes: u64,
    /// `used / total * 100`.
    pub usage_percent: f64,
}

impl DiskSnapshot {
    /// Build a snapshot from raw byte counts. Returns `None` for a zero-capacity filesystem.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_bytes(total_bytes: u64, used_bytes: u64, free_bytes: u64) -> Option<Self> {
        if total_bytes == 0 {
            return None;
        }
        Some(Self {
            total_bytes,
            used_bytes,
            free_bytes,
            usage_percent: used_bytes as f64 / total_bytes as f64 * 100.0,
        })
    }

    /// Whether usage is strictly above `percent`.
    #[must_use]
    pub fn exceeds(&self, percent: u8) -> bool {
        self.usage_percent > f64::from(percent)
    }
}

/// Usage of one configured root, `None` when it could not be sampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootUsage {
    /// Configured root directory.
    pub root: PathBuf,
    /// Snapshot taken for the root, if the probe succeeded.
    pub snapshot: Option<DiskSnapshot>,
}

/// Number of candidates discovered beneath a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootCandidates {
    /// Configured root directory.
    pub root: PathBuf,
    /// Classified files owned by the root.
    pub count: usize,
}

/// Why the safety gate refused a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Modified within the recency window, or its modification time could not be read.
    Recent,
    /// Held open by another process.
    InUse,
    /// The owning root's disk usage could not be sampled.
    UsageUnknown,
}

impl SkipReason {
    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::InUse => "in_use",
            Self::UsageUnknown => "usage_unknown",
        }
    }
}

/// Result of processing one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    /// The file was removed.
    Deleted {
        /// Size read immediately before removal.
        size_bytes: u64,
    },
    /// Dry run: the file would have been removed.
    WouldDelete {
        /// Size read at preview time.
        size_bytes: u64,
    },
    /// The safety gate or the usage probe refused the deletion.
    Skipped {
        /// Refusal reason.
        reason: SkipReason,
    },
    /// The remove operation failed.
    Failed {
        /// Rendered cause of the failure.
        cause: String,
    },
    /// The file vanished between discovery and deletion.
    NotFound,
}

impl DeletionOutcome {
    /// Bytes released (or that would be released) by this outcome.
    #[must_use]
    pub const fn freed_bytes(&self) -> Option<u64> {
        match self {
            Self::Deleted { size_bytes } | Self::WouldDelete { size_bytes } => Some(*size_bytes),
            Self::Skipped { .. } | Self::Failed { .. } | Self::NotFound => None,
        }
    }
}

/// A processed candidate and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDecision {
    /// Path of the candidate.
    pub path: PathBuf,
    /// Modification time observed during the scan.
    pub modified_at: DateTime<Utc>,
    /// Configured root the candidate belongs to.
    pub owner: PathBuf,
    /// What happened.
    #[serde(flatten)]
    pub outcome: DeletionOutcome,
}

/// Count-based plan computed once in quota mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaPlan {
    /// Number of candidates considered.
    pub total_count: usize,
    /// Newest candidates retained.
    pub keep_count: usize,
    /// Oldest candidates selected for deletion.
    pub delete_count: usize,
    /// Sum of the deletion set's sizes at planning time.
    pub planned_bytes: u64,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// No classified files beneath any root.
    NoFilesFound,
    /// Threshold mode: every sampled root already at or below the threshold.
    NoCleanupNeeded,
    /// Threshold mode: no root could be sampled, so the need for cleanup is unknown.
    UsageUnknown,
    /// Quota mode: the keep count covers every candidate.
    NothingToDelete,
    /// The confirmation capability declined the run.
    Cancelled,
    /// Threshold mode: a sampled root reached the threshold and the loop stopped.
    ThresholdReached {
        /// Root whose usage satisfied the threshold.
        root: PathBuf,
        /// Usage observed when the loop stopped.
        usage_percent: f64,
    },
    /// Every selected candidate was processed.
    Completed,
}

/// Running counters for a retention run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    /// Files removed, or previewed for removal in a dry run.
    pub deleted_count: usize,
    /// Bytes accumulated from confirmed removals (or previews).
    pub deleted_bytes: u64,
    /// Files refused by the safety gate or the usage probe.
    pub skipped: usize,
    /// Files whose removal failed.
    pub failed: usize,
    /// Files that vanished before removal.
    pub not_found: usize,
}

impl RunTally {
    fn record(&mut self, outcome: &DeletionOutcome) {
        match outcome {
            DeletionOutcome::Deleted { size_bytes } | DeletionOutcome::WouldDelete { size_bytes } => {
                self.deleted_count += 1;
                self.deleted_bytes = self.deleted_bytes.saturating_add(*size_bytes);
            }
            DeletionOutcome::Skipped { .. } => self.skipped += 1,
            DeletionOutcome::Failed { .. } => self.failed += 1,
            DeletionOutcome::NotFound => self.not_found += 1,
        }
    }
}

/// Everything a retention run decided, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionReport {
    /// Policy the run executed.
    pub policy: RetentionPolicy,
    /// Whether destructive calls were suppressed.
    pub dry_run: bool,
    /// Terminal state.
    pub status: RunStatus,
    /// Candidates discovered across all roots.
    pub candidates: usize,
    /// Candidates discovered per root.
    pub candidates_per_root: Vec<RootCandidates>,
    /// Quota plan, for quota runs that found candidates.
    pub quota_plan: Option<QuotaPlan>,
    /// Usage sampled before a threshold run started.
    pub initial_usage: Vec<RootUsage>,
    /// Per-file decisions.
    pub decisions: Vec<FileDecision>,
    /// Aggregated counters.
    pub tally: RunTally,
    /// Usage sampled once the run finished.
    pub final_usage: Vec<RootUsage>,
}

impl RetentionReport {
    pub(crate) const fn new(policy: RetentionPolicy, dry_run: bool) -> Self {
        Self {
            policy,
            dry_run,
            status: RunStatus::Completed,
            candidates: 0,
            candidates_per_root: Vec::new(),
            quota_plan: None,
            initial_usage: Vec::new(),
            decisions: Vec::new(),
            tally: RunTally {
                deleted_count: 0,
                deleted_bytes: 0,
                skipped: 0,
                failed: 0,
                not_found: 0,
            },
            final_usage: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, record: &LogFileRecord, outcome: DeletionOutcome) {
        self.tally.record(&outcome);
        self.decisions.push(FileDecision {
            path: record.path.clone(),
            modified_at: record.modified_at,
            owner: record.owner.clone(),
            outcome,
        });
    }

    /// Paths that were removed, or that a dry run would remove.
    pub fn removed_paths(&self) -> impl Iterator<Item = &Path> {
        self.decisions
            .iter()
            .filter(|decision| decision.outcome.freed_bytes().is_some())
            .map(|decision| decision.path.as_path())
    }

    /// Decisions refused by the safety gate or the usage probe.
    pub fn skipped(&self) -> impl Iterator<Item = (&Path, SkipReason)> {
        self.decisions
            .iter()
            .filter_map(|decision| match decision.outcome {
                DeletionOutcome::Skipped { reason } => Some((decision.path.as_path(), reason)),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};

    fn record(path: &str) -> LogFileRecord {
        LogFileRecord {
            path: PathBuf::from(path),
            modified_at: Utc::now(),
            size_bytes: Some(1),
            owner: PathBuf::from("/logs"),
        }
    }

    #[test]
    fn disk_snapshot_computes_usage_and_rejects_zero_capacity() -> Result<()> {
        let snapshot = DiskSnapshot::from_bytes(200, 150, 40).ok_or_else(|| anyhow!("snapshot"))?;
        assert!((snapshot.usage_percent - 75.0).abs() < f64::EPSILON);
        assert!(snapshot.exceeds(70));
        assert!(!snapshot.exceeds(75));
        assert!(DiskSnapshot::from_bytes(0, 0, 0).is_none());
        Ok(())
    }

    #[test]
    fn tally_accumulates_only_confirmed_removals() {
        let mut report = RetentionReport::new(RetentionPolicy::Quota { keep_percent: 50 }, false);
        report.record(&record("/logs/a.log"), DeletionOutcome::Deleted { size_bytes: 10 });
        report.record(
            &record("/logs/b.log"),
            DeletionOutcome::Failed {
                cause: "permission denied".to_string(),
            },
        );
        report.record(&record("/logs/c.log"), DeletionOutcome::NotFound);
        report.record(
            &record("/logs/d.log"),
            DeletionOutcome::Skipped {
                reason: SkipReason::InUse,
            },
        );

        assert_eq!(report.tally.deleted_count, 1);
        assert_eq!(report.tally.deleted_bytes, 10);
        assert_eq!(report.tally.failed, 1);
        assert_eq!(report.tally.not_found, 1);
        assert_eq!(report.tally.skipped, 1);
        assert_eq!(
            report.removed_paths().collect::<Vec<_>>(),
            vec![Path::new("/logs/a.log")]
        );
        assert_eq!(
            report.skipped().collect::<Vec<_>>(),
            vec![(Path::new("/logs/d.log"), SkipReason::InUse)]
        );
    }

    #[test]
    fn report_serializes_tagged_variants() -> Result<()> {
        let mut report =
            RetentionReport::new(RetentionPolicy::Threshold { usage_percent: 70 }, true);
        report.record(&record("/logs/a.log"), DeletionOutcome::WouldDelete { size_bytes: 4 });
        let value = serde_json::to_value(&report)?;
        assert_eq!(value["policy"]["mode"], "threshold");
        assert_eq!(value["policy"]["usage_percent"], 70);
        assert_eq!(value["status"]["status"], "completed");
        assert_eq!(value["decisions"][0]["outcome"], "would_delete");
        assert_eq!(value["decisions"][0]["size_bytes"], 4);
        Ok(())
    }
}
