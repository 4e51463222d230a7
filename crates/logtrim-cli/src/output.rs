//! Output renderers and formatting helpers for retention reports.

use std::io::{self, Write};

use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use logtrim_core::{
    DeletionOutcome, DiskSnapshot, RetentionPolicy, RetentionReport, RootUsage, RunStatus,
};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

pub(crate) fn render_report(
    out: &mut impl Write,
    report: &RetentionReport,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(report)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            writeln!(out, "{text}")
        }
        OutputFormat::Table => write_table(out, report),
    }
    .map_err(|err| CliError::failure(anyhow!("failed to write report: {err}")))
}

fn write_table(out: &mut impl Write, report: &RetentionReport) -> io::Result<()> {
    match report.policy {
        RetentionPolicy::Quota { keep_percent } => {
            writeln!(out, "mode: quota (keep newest {keep_percent}%)")?;
        }
        RetentionPolicy::Threshold { usage_percent } => {
            writeln!(out, "mode: threshold (stop at {usage_percent}% disk usage)")?;
        }
    }
    if report.dry_run {
        writeln!(out, "[DRY RUN] no files will be removed")?;
    }

    writeln!(out, "candidates: {}", report.candidates)?;
    for entry in &report.candidates_per_root {
        writeln!(out, "  {}: {} files", entry.root.display(), entry.count)?;
    }

    if !report.initial_usage.is_empty() {
        writeln!(out, "disk usage before cleanup:")?;
        for usage in &report.initial_usage {
            writeln!(out, "  {}", describe_usage(usage))?;
        }
    }

    if let Some(plan) = &report.quota_plan {
        writeln!(
            out,
            "plan: keep {} newest, delete {} oldest (about {})",
            plan.keep_count,
            plan.delete_count,
            format_bytes(plan.planned_bytes)
        )?;
    }

    if !report.decisions.is_empty() {
        writeln!(out, "{:<13} {:>9} {:<19} PATH", "ACTION", "SIZE", "MODIFIED")?;
        for decision in &report.decisions {
            let (action, detail) = describe_outcome(&decision.outcome);
            writeln!(
                out,
                "{:<13} {:>9} {:<19} {}",
                action,
                detail,
                format_time(decision.modified_at),
                decision.path.display()
            )?;
        }
    }

    writeln!(out, "{}", describe_status(&report.status))?;

    let tally = &report.tally;
    if report.dry_run {
        writeln!(
            out,
            "[DRY RUN] would delete {} files, freeing {}",
            tally.deleted_count,
            format_bytes(tally.deleted_bytes)
        )?;
    } else {
        writeln!(
            out,
            "deleted {} files, freed {}",
            tally.deleted_count,
            format_bytes(tally.deleted_bytes)
        )?;
    }
    if tally.skipped > 0 || tally.failed > 0 || tally.not_found > 0 {
        writeln!(
            out,
            "skipped: {}, failed: {}, not found: {}",
            tally.skipped, tally.failed, tally.not_found
        )?;
    }

    if !report.final_usage.is_empty() {
        writeln!(out, "disk usage after cleanup:")?;
        for usage in &report.final_usage {
            writeln!(out, "  {}", describe_usage(usage))?;
        }
    }
    Ok(())
}

fn describe_outcome(outcome: &DeletionOutcome) -> (&'static str, String) {
    match outcome {
        DeletionOutcome::Deleted { size_bytes } => ("deleted", format_bytes(*size_bytes)),
        DeletionOutcome::WouldDelete { size_bytes } => ("would delete", format_bytes(*size_bytes)),
        DeletionOutcome::Skipped { reason } => ("skipped", reason.as_str().to_string()),
        DeletionOutcome::Failed { cause } => ("failed", cause.clone()),
        DeletionOutcome::NotFound => ("not found", "-".to_string()),
    }
}

fn describe_status(status: &RunStatus) -> String {
    match status {
        RunStatus::NoFilesFound => "no log files found in any directory".to_string(),
        RunStatus::NoCleanupNeeded => {
            "all directories are at or below the usage threshold; no cleanup needed".to_string()
        }
        RunStatus::UsageUnknown => {
            "disk usage could not be determined for any directory; nothing deleted".to_string()
        }
        RunStatus::NothingToDelete => "keep count covers every file; nothing to delete".to_string(),
        RunStatus::Cancelled => "cancelled; no files were removed".to_string(),
        RunStatus::ThresholdReached {
            root,
            usage_percent,
        } => format!(
            "disk usage of {} reached {usage_percent:.1}%; stopped",
            root.display()
        ),
        RunStatus::Completed => "cleanup complete".to_string(),
    }
}

fn describe_usage(usage: &RootUsage) -> String {
    usage.snapshot.as_ref().map_or_else(
        || format!("{}: usage unknown", usage.root.display()),
        |snapshot| format!("{}: {}", usage.root.display(), describe_snapshot(snapshot)),
    )
}

pub(crate) fn describe_snapshot(snapshot: &DiskSnapshot) -> String {
    format!(
        "{:.1}% (total {}, used {}, free {})",
        snapshot.usage_percent,
        format_bytes(snapshot.total_bytes),
        format_bytes(snapshot.used_bytes),
        format_bytes(snapshot.free_bytes)
    )
}

pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", SIZE_UNITS[unit])
}
