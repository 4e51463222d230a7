//! Argument parsing and run orchestration for the `logtrim` binary.

use std::io::{self, IsTerminal, Write};

use clap::{Parser, Subcommand, ValueEnum};
use logtrim_core::{
    AutoConfirm, Confirm, InUseChecker, RetentionEngine, RetentionPolicy, RetentionReport,
    RetentionRequest, SafetyGate, StatvfsProbe, sweep_empty_date_dirs,
};
use logtrim_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::error::{CliError, CliResult};
use crate::output::render_report;
use crate::prompt::PromptConfirm;

/// Parses CLI arguments, executes the requested policy, and renders the
/// report on stdout. Returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return i32::from(err.use_stderr());
        }
    };

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.map_or_else(LogFormat::infer, LogFormat::from),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let interactive = io::stdin().is_terminal();
    let stdout = io::stdout();
    match execute(&cli, &mut stdout.lock(), interactive) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn execute(cli: &Cli, out: &mut impl Write, interactive: bool) -> CliResult<()> {
    let (directories, policy) = cli.command.request_parts();
    let request = RetentionRequest::parse(directories, policy).map_err(CliError::from)?;

    let run_id = Uuid::new_v4();
    let span = info_span!("retention_run", %run_id, mode = policy.label());
    let _entered = span.enter();

    let engine = RetentionEngine::new(StatvfsProbe, SafetyGate::new(InUseChecker::detect()))
        .with_dry_run(cli.dry_run);
    let mut auto = AutoConfirm;
    let mut prompt = PromptConfirm::stdio();
    let confirm: &mut dyn Confirm = if cli.auto_confirm {
        &mut auto
    } else {
        &mut prompt
    };
    let report = engine.run(&request, confirm);
    render_report(out, &report, cli.output)?;

    if should_sweep(cli, &report, interactive, &mut prompt) {
        let removed: usize = request
            .roots
            .iter()
            .map(|root| sweep_empty_date_dirs(root))
            .sum();
        info!(removed, "empty date directory sweep finished");
    }
    Ok(())
}

fn should_sweep<C: SweepPrompt>(
    cli: &Cli,
    report: &RetentionReport,
    interactive: bool,
    prompt: &mut C,
) -> bool {
    if cli.dry_run {
        return false;
    }
    if cli.sweep_empty_dirs {
        return true;
    }
    if cli.auto_confirm || !interactive || report.tally.deleted_count == 0 {
        return false;
    }
    prompt.ask_sweep()
}

trait SweepPrompt {
    fn ask_sweep(&mut self) -> bool;
}

impl<R: io::BufRead, W: Write> SweepPrompt for PromptConfirm<R, W> {
    fn ask_sweep(&mut self) -> bool {
        self.ask("remove empty date directories (20YY-MM-DD) under the configured roots?")
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "logtrim",
    version,
    about = "Delete old log files to keep disk usage under control"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "LOGTRIM_DRY_RUN",
        help = "Show what would be deleted without removing anything"
    )]
    dry_run: bool,
    #[arg(
        long,
        global = true,
        env = "LOGTRIM_AUTO_CONFIRM",
        help = "Proceed without asking for confirmation"
    )]
    auto_confirm: bool,
    #[arg(
        long,
        global = true,
        help = "Remove empty date directories after the run without asking"
    )]
    sweep_empty_dirs: bool,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select the report format"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "LOGTRIM_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    log_level: String,
    #[arg(long, global = true, value_enum, env = "LOGTRIM_LOG_FORMAT")]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep the newest share of log files and delete the oldest rest.
    Quota {
        #[arg(help = "Colon-separated list of log directories")]
        directories: String,
        #[arg(help = "Percentage of files to keep (1-99)")]
        keep_percent: u8,
    },
    /// Delete the oldest log files until disk usage is at or below a percentage.
    Threshold {
        #[arg(help = "Colon-separated list of log directories")]
        directories: String,
        #[arg(help = "Target disk usage percentage (1-99)")]
        usage_percent: u8,
    },
}

impl Command {
    fn request_parts(&self) -> (&str, RetentionPolicy) {
        match self {
            Self::Quota {
                directories,
                keep_percent,
            } => (
                directories.as_str(),
                RetentionPolicy::Quota {
                    keep_percent: *keep_percent,
                },
            ),
            Self::Threshold {
                directories,
                usage_percent,
            } => (
                directories.as_str(),
                RetentionPolicy::Threshold {
                    usage_percent: *usage_percent,
                },
            ),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use logtrim_test_support::LogTree;
    use std::time::Duration;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    struct Answer(bool);

    impl SweepPrompt for Answer {
        fn ask_sweep(&mut self) -> bool {
            self.0
        }
    }

    fn parse(args: &[&str]) -> Result<Cli> {
        Ok(Cli::try_parse_from(
            std::iter::once("logtrim").chain(args.iter().copied()),
        )?)
    }

    fn execute_to_string(cli: &Cli) -> Result<String> {
        let mut out = Vec::new();
        execute(cli, &mut out, false).map_err(|err| anyhow!(err.display_message()))?;
        Ok(String::from_utf8(out)?)
    }

    fn populate(tree: &LogTree, count: u32) -> Result<()> {
        for index in 0..count {
            tree.write_aged(
                &format!("app/{index:02}.log"),
                b"0123456789",
                DAY * (2 + index),
            )?;
        }
        Ok(())
    }

    #[test]
    fn parses_quota_with_global_flags() -> Result<()> {
        let cli = parse(&["quota", "/var/log:/srv/logs", "70", "--dry-run", "--output", "json"])?;
        assert!(cli.dry_run);
        assert!(!cli.auto_confirm);
        assert_eq!(cli.output, OutputFormat::Json);
        let (directories, policy) = cli.command.request_parts();
        assert_eq!(directories, "/var/log:/srv/logs");
        assert_eq!(policy, RetentionPolicy::Quota { keep_percent: 70 });
        Ok(())
    }

    #[test]
    fn parses_threshold_command() -> Result<()> {
        let cli = parse(&["--auto-confirm", "threshold", "/var/log", "85"])?;
        assert!(cli.auto_confirm);
        assert_eq!(
            cli.command.request_parts().1,
            RetentionPolicy::Threshold { usage_percent: 85 }
        );
        Ok(())
    }

    #[test]
    fn rejects_non_numeric_percent() {
        assert!(parse(&["quota", "/var/log", "seventy"]).is_err());
        assert!(parse(&["threshold", "/var/log", "300"]).is_err());
    }

    #[test]
    fn out_of_range_percent_is_a_validation_error() -> Result<()> {
        let tree = LogTree::new()?;
        let root = tree.root().display().to_string();
        let cli = parse(&["quota", &root, "100", "--auto-confirm"])?;
        let mut out = Vec::new();
        let err = execute(&cli, &mut out, false)
            .err()
            .ok_or_else(|| anyhow!("expected validation error"))?;
        assert_eq!(err.exit_code(), 1);
        assert!(err.display_message().contains("keep_percent"));
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn missing_directory_is_a_validation_error() -> Result<()> {
        let tree = LogTree::new()?;
        let missing = tree.root().join("missing").display().to_string();
        let cli = parse(&["threshold", &missing, "70", "--auto-confirm"])?;
        let mut out = Vec::new();
        let err = execute(&cli, &mut out, false)
            .err()
            .ok_or_else(|| anyhow!("expected validation error"))?;
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.display_message(),
            format!("directory does not exist: {missing}")
        );
        Ok(())
    }

    #[test]
    fn auto_confirmed_quota_run_deletes_and_reports() -> Result<()> {
        let tree = LogTree::new()?;
        populate(&tree, 10)?;
        let root = tree.root().display().to_string();
        let cli = parse(&["quota", &root, "70", "--auto-confirm"])?;

        let text = execute_to_string(&cli)?;

        assert!(text.contains("plan: keep 7 newest, delete 3 oldest"));
        assert!(text.contains("deleted 3 files, freed 30.0B"));
        assert!(!tree.root().join("app/09.log").exists());
        assert!(tree.root().join("app/06.log").exists());
        Ok(())
    }

    #[test]
    fn dry_run_json_report_leaves_files_in_place() -> Result<()> {
        let tree = LogTree::new()?;
        populate(&tree, 4)?;
        let root = tree.root().display().to_string();
        let cli = parse(&["--dry-run", "--output", "json", "quota", &root, "50"])?;

        let text = execute_to_string(&cli)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;

        assert_eq!(value["dry_run"], true);
        assert_eq!(value["tally"]["deleted_count"], 2);
        assert_eq!(value["decisions"][0]["outcome"], "would_delete");
        assert_eq!(tree.bytes_present(), 40);
        Ok(())
    }

    #[test]
    fn sweep_runs_only_when_allowed() -> Result<()> {
        let tree = LogTree::new()?;
        let root = tree.root().display().to_string();
        let mut cli = parse(&["quota", &root, "50"])?;
        let (directories, policy) = cli.command.request_parts();
        let request = RetentionRequest::parse(directories, policy)?;
        let engine = RetentionEngine::new(StatvfsProbe, SafetyGate::new(|_: &std::path::Path| false));
        let mut report = engine.run(&request, &mut AutoConfirm);
        report.tally.deleted_count = 1;

        assert!(should_sweep(&cli, &report, true, &mut Answer(true)));
        assert!(!should_sweep(&cli, &report, true, &mut Answer(false)));
        assert!(!should_sweep(&cli, &report, false, &mut Answer(true)));

        cli.auto_confirm = true;
        assert!(!should_sweep(&cli, &report, true, &mut Answer(true)));
        cli.sweep_empty_dirs = true;
        assert!(should_sweep(&cli, &report, false, &mut Answer(false)));
        cli.dry_run = true;
        assert!(!should_sweep(&cli, &report, true, &mut Answer(true)));
        Ok(())
    }

    #[test]
    fn sweep_flag_removes_empty_date_directories() -> Result<()> {
        let tree = LogTree::new()?;
        populate(&tree, 2)?;
        tree.mkdir("2025-03-01")?;
        let root = tree.root().display().to_string();
        let cli = parse(&["quota", &root, "50", "--auto-confirm", "--sweep-empty-dirs"])?;

        execute_to_string(&cli)?;

        assert!(!tree.root().join("2025-03-01").exists());
        assert!(tree.root().join("app").exists());
        Ok(())
    }
}
