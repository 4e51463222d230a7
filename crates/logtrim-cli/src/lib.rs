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
#![allow(clippy::redundant_pub_crate)]

//! Command-line shell around the logtrim retention engine.
//!
//! Layout:
//! - `cli.rs`: argument parsing, run orchestration, and exit codes
//! - `error.rs`: CLI error type and diagnostics for validation failures
//! - `prompt.rs`: interactive yes/no confirmation
//! - `output.rs`: report renderers and byte formatting
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod error;
pub(crate) mod output;
pub(crate) mod prompt;

pub use cli::run;
