#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Disk-space-aware log retention.
//!
//! Layout:
//! - `classify.rs`: naming rules for managed log files
//! - `scan.rs`: recursive discovery across configured roots
//! - `gate.rs`: recency and in-use checks applied before every deletion
//! - `probe.rs`: live filesystem usage sampling
//! - `engine.rs`: quota and threshold retention policies
//! - `request.rs`: validation of directories and percentages
//! - `sweep.rs`: removal of empty date directories after a run
//! - `model.rs`: records, snapshots, outcomes, and the run report

pub mod classify;
pub mod engine;
pub mod error;
pub mod gate;
pub mod model;
pub mod probe;
pub mod request;
pub mod scan;
pub mod sweep;

pub use classify::is_managed_log;
pub use engine::{AutoConfirm, Confirm, ConfirmPrompt, RetentionEngine, plan_quota};
pub use error::{RetentionError, RetentionResult};
pub use gate::{GateDecision, InUseCheck, InUseChecker, SafetyGate};
pub use model::{
    DeletionOutcome, DiskSnapshot, FileDecision, LogFileRecord, QuotaPlan, RetentionPolicy,
    RetentionReport, RootCandidates, RootUsage, RunStatus, RunTally, SkipReason,
};
pub use probe::{DiskProbe, StatvfsProbe};
pub use request::RetentionRequest;
pub use scan::{scan_root, scan_roots};
pub use sweep::sweep_empty_date_dirs;
