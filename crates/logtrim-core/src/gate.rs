//! Safety checks applied immediately before each deletion.
//!
//! # Design
//! - Both checks are re-evaluated per file at deletion time, never precomputed.
//! - Missing information blocks deletion: an unreadable modification time counts as recent.
//! - In-use detection is best effort. When no process-inspection tool is
//!   installed, files are treated as not in use and a warning is logged once.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::model::SkipReason;

const RECENT_WINDOW_HOURS: i64 = 24;
const PRIMARY_TOOL: &str = "lsof";
const FALLBACK_TOOL: &str = "fuser";

/// Capability answering whether another process currently holds a file open.
pub trait InUseCheck {
    /// Returns `true` when the file is open elsewhere.
    fn is_in_use(&self, path: &Path) -> bool;
}

impl<F> InUseCheck for F
where
    F: Fn(&Path) -> bool,
{
    fn is_in_use(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Process-inspection strategy resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InUseChecker {
    /// Primary inspection tool, invoked as `<tool> -- <path>`.
    Primary(PathBuf),
    /// Fallback inspection tool, invoked as `<tool> -s <path>`.
    Fallback(PathBuf),
    /// No tool available; every file is assumed not in use.
    Unavailable,
}

impl InUseChecker {
    /// Resolve the strategy from the current `PATH`.
    #[must_use]
    pub fn detect() -> Self {
        let checker = Self::detect_in(env::var_os("PATH"));
        if checker == Self::Unavailable {
            warn!(
                primary = PRIMARY_TOOL,
                fallback = FALLBACK_TOOL,
                "no process inspection tool found; open files cannot be detected and will be treated as not in use"
            );
        }
        checker
    }

    fn detect_in(search_path: Option<OsString>) -> Self {
        let dirs: Vec<PathBuf> = search_path
            .map(|value| env::split_paths(&value).collect())
            .unwrap_or_default();
        if let Some(program) = find_program(&dirs, PRIMARY_TOOL) {
            return Self::Primary(program);
        }
        if let Some(program) = find_program(&dirs, FALLBACK_TOOL) {
            return Self::Fallback(program);
        }
        Self::Unavailable
    }

    /// Stable label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Primary(_) => "primary",
            Self::Fallback(_) => "fallback",
            Self::Unavailable => "unavailable",
        }
    }
}

impl InUseCheck for InUseChecker {
    fn is_in_use(&self, path: &Path) -> bool {
        let status = match self {
            Self::Primary(program) => Command::new(program)
                .arg("--")
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status(),
            Self::Fallback(program) => Command::new(program)
                .arg("-s")
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status(),
            Self::Unavailable => return false,
        };
        match status {
            Ok(status) => status.success(),
            Err(err) => {
                warn!(
                    error = %err,
                    strategy = self.label(),
                    path = %path.display(),
                    "process inspection failed; treating file as not in use"
                );
                false
            }
        }
    }
}

fn find_program(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

/// Outcome of the safety gate for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Eligible for deletion.
    Pass,
    /// Refused for the given reason.
    Blocked(SkipReason),
    /// The file no longer exists.
    Missing,
}

/// Recency and in-use checks; both must pass before a file may be deleted.
#[derive(Debug, Clone)]
pub struct SafetyGate<C = InUseChecker> {
    in_use: C,
    recent_window: TimeDelta,
}

impl<C: InUseCheck> SafetyGate<C> {
    /// Build a gate with the fixed 24 hour recency window.
    #[must_use]
    pub fn new(in_use: C) -> Self {
        Self {
            in_use,
            recent_window: TimeDelta::hours(RECENT_WINDOW_HOURS),
        }
    }

    /// Evaluate `path` against the gate as of `now`, reading fresh metadata.
    #[must_use]
    pub fn evaluate(&self, path: &Path, now: DateTime<Utc>) -> GateDecision {
        let modified = match fs::metadata(path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return GateDecision::Missing,
            Err(err) => {
                debug!(
                    error = %err,
                    path = %path.display(),
                    "modification time unreadable; treating file as recent"
                );
                return GateDecision::Blocked(SkipReason::Recent);
            }
        };

        if now.signed_duration_since(modified) < self.recent_window {
            return GateDecision::Blocked(SkipReason::Recent);
        }
        if self.in_use.is_in_use(path) {
            return GateDecision::Blocked(SkipReason::InUse);
        }
        GateDecision::Pass
    }
}
