//! Retention decision engine.
//!
//! # Design
//! - Quota mode fixes the deletion set upfront from the candidate count.
//! - Threshold mode walks candidates oldest first and re-samples the owning
//!   root's usage before every deletion; the whole loop stops as soon as any
//!   sampled root is at or below the threshold.
//! - Unknown usage never counts as under the threshold. With no sampled root
//!   the run ends without touching files.
//! - The safety gate is evaluated per file immediately before deletion in both modes.
//! - Dry runs execute every step except the remove call.
//! - Execution is strictly sequential; nothing is deleted concurrently.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn};

use crate::gate::{GateDecision, InUseCheck, InUseChecker, SafetyGate};
use crate::model::{
    DeletionOutcome, LogFileRecord, QuotaPlan, RetentionPolicy, RetentionReport, RootCandidates,
    RootUsage, RunStatus, SkipReason,
};
use crate::probe::{DiskProbe, StatvfsProbe};
use crate::request::RetentionRequest;
use crate::scan::scan_roots;

/// What the engine is about to do, presented to the confirmation capability.
#[derive(Debug, Clone, Copy)]
pub enum ConfirmPrompt<'a> {
    /// Quota mode: the fixed deletion set, oldest files of the newest-first ordering.
    QuotaDeletion {
        /// Computed plan.
        plan: &'a QuotaPlan,
        /// Files selected for deletion.
        files: &'a [LogFileRecord],
    },
    /// Threshold mode: at least one root is above the threshold.
    ThresholdCleanup {
        /// Target usage percentage.
        usage_percent: u8,
        /// Usage sampled for every root before the run.
        roots: &'a [RootUsage],
        /// Number of candidates that may be considered.
        candidates: usize,
    },
}

/// Capability deciding whether a destructive run may proceed.
pub trait Confirm {
    /// Returns `true` to proceed.
    fn confirm(&mut self, prompt: &ConfirmPrompt<'_>) -> bool;
}

/// Confirmation that always proceeds, used for unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _prompt: &ConfirmPrompt<'_>) -> bool {
        true
    }
}

/// Quota plan together with the partition of candidates it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSelection {
    /// Counts and planned bytes.
    pub plan: QuotaPlan,
    /// Newest candidates retained, newest first.
    pub keep: Vec<LogFileRecord>,
    /// Oldest candidates selected for deletion, newest first.
    pub delete: Vec<LogFileRecord>,
}

impl QuotaSelection {
    /// Re-read sizes of the deletion set and recompute the planned bytes.
    pub fn refresh_sizes(&mut self) {
        for record in &mut self.delete {
            record.size_bytes = fs::metadata(&record.path).ok().map(|meta| meta.len());
        }
        self.plan.planned_bytes = planned_bytes(&self.delete);
    }
}

/// Partition candidates for quota mode: keep the newest
/// `floor(total * keep_percent / 100)` and select the rest for deletion.
#[must_use]
pub fn plan_quota(mut records: Vec<LogFileRecord>, keep_percent: u8) -> QuotaSelection {
    sort_newest_first(&mut records);
    let total_count = records.len();
    let keep_count = total_count * usize::from(keep_percent) / 100;
    let delete = records.split_off(keep_count.min(total_count));
    let plan = QuotaPlan {
        total_count,
        keep_count: records.len(),
        delete_count: delete.len(),
        planned_bytes: planned_bytes(&delete),
    };
    QuotaSelection {
        plan,
        keep: records,
        delete,
    }
}

fn planned_bytes(records: &[LogFileRecord]) -> u64 {
    records
        .iter()
        .filter_map(|record| record.size_bytes)
        .fold(0u64, u64::saturating_add)
}

/// Newest first; ties broken by path.
pub(crate) fn sort_newest_first(records: &mut [LogFileRecord]) {
    records.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Oldest first; ties broken by path.
pub(crate) fn sort_oldest_first(records: &mut [LogFileRecord]) {
    records.sort_by(|a, b| {
        a.modified_at
            .cmp(&b.modified_at)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Executes retention policies against configured roots.
#[derive(Debug, Clone)]
pub struct RetentionEngine<P = StatvfsProbe, C = InUseChecker> {
    probe: P,
    gate: SafetyGate<C>,
    dry_run: bool,
    clock: fn() -> DateTime<Utc>,
}

impl<P: DiskProbe, C: InUseCheck> RetentionEngine<P, C> {
    /// Build an engine that performs live deletions.
    #[must_use]
    pub fn new(probe: P, gate: SafetyGate<C>) -> Self {
        Self {
            probe,
            gate,
            dry_run: false,
            clock: Utc::now,
        }
    }

    /// Toggle dry-run mode: every step runs except the remove call.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the clock used by the recency check.
    #[must_use]
    pub const fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Scan the request's roots and apply its policy.
    ///
    /// Every per-file failure is recorded in the report; nothing aborts the run.
    #[must_use]
    pub fn run(&self, request: &RetentionRequest, confirm: &mut dyn Confirm) -> RetentionReport {
        let span = info_span!(
            "retention",
            mode = request.policy.label(),
            percent = request.policy.percent(),
            dry_run = self.dry_run
        );
        let _entered = span.enter();

        let mut report = RetentionReport::new(request.policy, self.dry_run);
        let records = scan_roots(&request.roots);
        report.candidates = records.len();
        report.candidates_per_root = request
            .roots
            .iter()
            .map(|root| RootCandidates {
                root: root.clone(),
                count: records.iter().filter(|record| &record.owner == root).count(),
            })
            .collect();
        info!(candidates = records.len(), roots = request.roots.len(), "scan complete");

        match request.policy {
            RetentionPolicy::Quota { keep_percent } => {
                self.run_quota(records, keep_percent, confirm, &mut report);
            }
            RetentionPolicy::Threshold { usage_percent } => {
                self.run_threshold(&request.roots, records, usage_percent, confirm, &mut report);
            }
        }

        report.final_usage = self.sample_roots(&request.roots);
        info!(
            status = ?report.status,
            deleted = report.tally.deleted_count,
            deleted_bytes = report.tally.deleted_bytes,
            skipped = report.tally.skipped,
            failed = report.tally.failed,
            not_found = report.tally.not_found,
            "retention run finished"
        );
        report
    }

    fn run_quota(
        &self,
        records: Vec<LogFileRecord>,
        keep_percent: u8,
        confirm: &mut dyn Confirm,
        report: &mut RetentionReport,
    ) {
        if records.is_empty() {
            report.status = RunStatus::NoFilesFound;
            return;
        }

        let mut selection = plan_quota(records, keep_percent);
        selection.refresh_sizes();
        report.quota_plan = Some(selection.plan);
        info!(
            total = selection.plan.total_count,
            keep = selection.plan.keep_count,
            delete = selection.plan.delete_count,
            planned_bytes = selection.plan.planned_bytes,
            "quota plan computed"
        );

        if selection.delete.is_empty() {
            report.status = RunStatus::NothingToDelete;
            return;
        }
        if !self.dry_run
            && !confirm.confirm(&ConfirmPrompt::QuotaDeletion {
                plan: &selection.plan,
                files: &selection.delete,
            })
        {
            info!("quota deletion declined");
            report.status = RunStatus::Cancelled;
            return;
        }

        for record in &selection.delete {
            let outcome = self
                .gate_outcome(record)
                .unwrap_or_else(|| self.remove(record));
            report.record(record, outcome);
        }
        report.status = RunStatus::Completed;
    }

    fn run_threshold(
        &self,
        roots: &[PathBuf],
        mut records: Vec<LogFileRecord>,
        usage_percent: u8,
        confirm: &mut dyn Confirm,
        report: &mut RetentionReport,
    ) {
        if records.is_empty() {
            report.status = RunStatus::NoFilesFound;
            return;
        }
        sort_oldest_first(&mut records);

        report.initial_usage = self.sample_roots(roots);
        if report
            .initial_usage
            .iter()
            .all(|usage| usage.snapshot.is_none())
        {
            warn!(
                threshold = usage_percent,
                "disk usage unknown for every root; nothing deleted"
            );
            report.status = RunStatus::UsageUnknown;
            return;
        }
        let over_threshold = report
            .initial_usage
            .iter()
            .any(|usage| usage.snapshot.is_some_and(|snapshot| snapshot.exceeds(usage_percent)));
        if !over_threshold {
            info!(threshold = usage_percent, "all roots at or below threshold");
            report.status = RunStatus::NoCleanupNeeded;
            return;
        }
        if !self.dry_run
            && !confirm.confirm(&ConfirmPrompt::ThresholdCleanup {
                usage_percent,
                roots: &report.initial_usage,
                candidates: records.len(),
            })
        {
            info!("threshold cleanup declined");
            report.status = RunStatus::Cancelled;
            return;
        }

        for record in &records {
            if let Some(outcome) = self.gate_outcome(record) {
                report.record(record, outcome);
                continue;
            }

            match self.probe.snapshot(&record.owner) {
                Ok(snapshot) if !snapshot.exceeds(usage_percent) => {
                    info!(
                        root = %record.owner.display(),
                        usage_percent = snapshot.usage_percent,
                        threshold = usage_percent,
                        "usage at or below threshold; stopping"
                    );
                    report.status = RunStatus::ThresholdReached {
                        root: record.owner.clone(),
                        usage_percent: snapshot.usage_percent,
                    };
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        error = %err,
                        root = %record.owner.display(),
                        path = %record.path.display(),
                        "disk usage unknown; skipping file"
                    );
                    report.record(
                        record,
                        DeletionOutcome::Skipped {
                            reason: SkipReason::UsageUnknown,
                        },
                    );
                    continue;
                }
            }

            let outcome = self.remove(record);
            report.record(record, outcome);
        }
        report.status = RunStatus::Completed;
    }

    fn sample_roots(&self, roots: &[PathBuf]) -> Vec<RootUsage> {
        roots
            .iter()
            .map(|root| {
                let snapshot = match self.probe.snapshot(root) {
                    Ok(snapshot) => Some(snapshot),
                    Err(err) => {
                        warn!(
                            error = %err,
                            root = %root.display(),
                            "disk usage unknown for root"
                        );
                        None
                    }
                };
                RootUsage {
                    root: root.clone(),
                    snapshot,
                }
            })
            .collect()
    }

    fn gate_outcome(&self, record: &LogFileRecord) -> Option<DeletionOutcome> {
        match self.gate.evaluate(&record.path, (self.clock)()) {
            GateDecision::Pass => None,
            GateDecision::Missing => {
                info!(path = %record.path.display(), "file vanished before deletion");
                Some(DeletionOutcome::NotFound)
            }
            GateDecision::Blocked(reason) => {
                info!(
                    path = %record.path.display(),
                    reason = reason.as_str(),
                    "skipping file"
                );
                Some(DeletionOutcome::Skipped { reason })
            }
        }
    }

    fn remove(&self, record: &LogFileRecord) -> DeletionOutcome {
        let path = &record.path;
        let size_bytes = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "file vanished before deletion");
                return DeletionOutcome::NotFound;
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to stat file");
                return DeletionOutcome::Failed {
                    cause: err.to_string(),
                };
            }
        };

        if self.dry_run {
            info!(path = %path.display(), size_bytes, "would delete");
            return DeletionOutcome::WouldDelete { size_bytes };
        }

        match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), size_bytes, "deleted");
                DeletionOutcome::Deleted { size_bytes }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "file vanished before deletion");
                DeletionOutcome::NotFound
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to delete file");
                DeletionOutcome::Failed {
                    cause: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::collections::HashSet;

    fn record(name: &str, age_hours: i64) -> LogFileRecord {
        LogFileRecord {
            path: PathBuf::from("/logs").join(name),
            modified_at: Utc::now() - TimeDelta::hours(age_hours),
            size_bytes: Some(10),
            owner: PathBuf::from("/logs"),
        }
    }

    fn aged_records(count: i64) -> Vec<LogFileRecord> {
        (0..count)
            .map(|index| record(&format!("{index}.log"), 48 + index))
            .collect()
    }

    #[test]
    fn quota_plan_selects_the_oldest_tail() {
        let selection = plan_quota(aged_records(100), 70);

        assert_eq!(selection.plan.total_count, 100);
        assert_eq!(selection.plan.keep_count, 70);
        assert_eq!(selection.plan.delete_count, 30);
        assert_eq!(selection.plan.planned_bytes, 300);

        let deleted: HashSet<_> = selection
            .delete
            .iter()
            .map(|record| record.path.clone())
            .collect();
        let expected: HashSet<_> = (70..100)
            .map(|index| PathBuf::from("/logs").join(format!("{index}.log")))
            .collect();
        assert_eq!(deleted, expected);
    }

    #[test]
    fn quota_plan_counts_always_add_up() {
        for total in [0, 1, 2, 3, 7, 10, 33] {
            for keep_percent in [1, 25, 50, 70, 99] {
                let selection = plan_quota(aged_records(total), keep_percent);
                let plan = selection.plan;
                assert_eq!(plan.keep_count + plan.delete_count, plan.total_count);
                assert_eq!(plan.total_count, usize::try_from(total).unwrap_or_default());
                assert_eq!(
                    plan.keep_count,
                    plan.total_count * usize::from(keep_percent) / 100
                );

                let newest_deleted = selection.delete.iter().map(|r| r.modified_at).max();
                let oldest_kept = selection.keep.iter().map(|r| r.modified_at).min();
                if let (Some(deleted), Some(kept)) = (newest_deleted, oldest_kept) {
                    assert!(deleted <= kept);
                }
            }
        }
    }

    #[test]
    fn quota_plan_handles_ties_without_loss_or_duplication() {
        let stamp = Utc::now() - TimeDelta::hours(72);
        let records: Vec<_> = (0..9)
            .map(|index| {
                let mut record = record(&format!("tie-{index}.log"), 0);
                record.modified_at = stamp;
                record
            })
            .collect();

        let first = plan_quota(records.clone(), 50);
        let second = plan_quota(records.into_iter().rev().collect(), 50);

        assert_eq!(first.plan.keep_count, 4);
        assert_eq!(first.plan.delete_count, 5);
        let mut all: Vec<_> = first
            .keep
            .iter()
            .chain(first.delete.iter())
            .map(|record| record.path.clone())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 9);
        assert_eq!(first, second, "tie order must be stable across input orderings");
    }

    #[test]
    fn oldest_first_ordering_breaks_ties_by_path() {
        let stamp = Utc::now();
        let mut records = vec![record("b.log", 5), record("a.log", 5), record("c.log", 9)];
        for record in &mut records[..2] {
            record.modified_at = stamp;
        }
        sort_oldest_first(&mut records);
        let names: Vec<_> = records
            .iter()
            .filter_map(|record| record.path.file_name())
            .collect();
        assert_eq!(names, ["c.log", "a.log", "b.log"]);
    }

    #[test]
    fn auto_confirm_always_proceeds() {
        let plan = QuotaPlan {
            total_count: 1,
            keep_count: 0,
            delete_count: 1,
            planned_bytes: 0,
        };
        assert!(AutoConfirm.confirm(&ConfirmPrompt::QuotaDeletion {
            plan: &plan,
            files: &[],
        }));
    }
}
