//! Interactive yes/no confirmation on a terminal.

use std::io::{self, BufRead, Write};

use logtrim_core::{Confirm, ConfirmPrompt};

use crate::output::{describe_snapshot, format_bytes, format_time};

/// Confirmation that renders what is about to happen and reads a `y`/`N` answer.
pub(crate) struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl PromptConfirm<io::StdinLock<'static>, io::Stderr> {
    /// Read answers from stdin; prompts go to stderr so stdout carries only the report.
    pub(crate) fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub(crate) const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask a free-form yes/no question. Anything but `y`/`yes` is a no.
    pub(crate) fn ask(&mut self, question: &str) -> bool {
        if write!(self.output, "{question} (y/N): ")
            .and_then(|()| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_yes(&answer),
        }
    }

    fn describe(&mut self, prompt: &ConfirmPrompt<'_>) -> io::Result<()> {
        match prompt {
            ConfirmPrompt::QuotaDeletion { plan, files } => {
                writeln!(
                    self.output,
                    "{} log files found; keeping the newest {} and deleting {} ({}):",
                    plan.total_count,
                    plan.keep_count,
                    plan.delete_count,
                    format_bytes(plan.planned_bytes)
                )?;
                for file in *files {
                    let size = file
                        .size_bytes
                        .map_or_else(|| "unknown".to_string(), format_bytes);
                    writeln!(
                        self.output,
                        "  {}  {}  {size}",
                        format_time(file.modified_at),
                        file.path.display()
                    )?;
                }
            }
            ConfirmPrompt::ThresholdCleanup {
                usage_percent,
                roots,
                candidates,
            } => {
                writeln!(
                    self.output,
                    "disk usage exceeds {usage_percent}% for at least one directory:"
                )?;
                for usage in *roots {
                    match &usage.snapshot {
                        Some(snapshot) => writeln!(
                            self.output,
                            "  {}: {}",
                            usage.root.display(),
                            describe_snapshot(snapshot)
                        )?,
                        None => writeln!(self.output, "  {}: usage unknown", usage.root.display())?,
                    }
                }
                writeln!(
                    self.output,
                    "up to {candidates} log files may be deleted, oldest first"
                )?;
            }
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &ConfirmPrompt<'_>) -> bool {
        if self.describe(prompt).is_err() {
            return false;
        }
        self.ask("proceed?")
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Utc;
    use logtrim_core::{DiskSnapshot, LogFileRecord, QuotaPlan, RootUsage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn quota_prompt_answer(answer: &str) -> Result<(bool, String)> {
        let plan = QuotaPlan {
            total_count: 2,
            keep_count: 1,
            delete_count: 1,
            planned_bytes: 1536,
        };
        let files = [LogFileRecord {
            path: PathBuf::from("/logs/old.log"),
            modified_at: Utc::now(),
            size_bytes: Some(1536),
            owner: PathBuf::from("/logs"),
        }];
        let mut output = Vec::new();
        let accepted = PromptConfirm::new(Cursor::new(answer.to_string()), &mut output).confirm(
            &ConfirmPrompt::QuotaDeletion {
                plan: &plan,
                files: &files,
            },
        );
        Ok((accepted, String::from_utf8(output)?))
    }

    #[test]
    fn accepts_yes_in_any_case() -> Result<()> {
        for answer in ["y\n", "Y\n", "yes\n", " YES \n"] {
            let (accepted, _) = quota_prompt_answer(answer)?;
            assert!(accepted, "answer {answer:?} should proceed");
        }
        Ok(())
    }

    #[test]
    fn anything_else_declines() -> Result<()> {
        for answer in ["n\n", "\n", "yep\n", ""] {
            let (accepted, _) = quota_prompt_answer(answer)?;
            assert!(!accepted, "answer {answer:?} should decline");
        }
        Ok(())
    }

    #[test]
    fn quota_prompt_lists_files_to_delete() -> Result<()> {
        let (_, text) = quota_prompt_answer("n\n")?;
        assert!(text.contains("2 log files found; keeping the newest 1 and deleting 1 (1.5KB)"));
        assert!(text.contains("/logs/old.log"));
        assert!(text.ends_with("proceed? (y/N): "));
        Ok(())
    }

    #[test]
    fn threshold_prompt_summarises_roots() -> Result<()> {
        let roots = [
            RootUsage {
                root: PathBuf::from("/logs"),
                snapshot: DiskSnapshot::from_bytes(1024, 800, 224),
            },
            RootUsage {
                root: PathBuf::from("/gone"),
                snapshot: None,
            },
        ];
        let mut output = Vec::new();
        let accepted = PromptConfirm::new(Cursor::new("y\n"), &mut output).confirm(
            &ConfirmPrompt::ThresholdCleanup {
                usage_percent: 70,
                roots: &roots,
                candidates: 12,
            },
        );
        let text = String::from_utf8(output)?;

        assert!(accepted);
        assert!(text.contains("disk usage exceeds 70%"));
        assert!(text.contains("/logs: 78.1% (total 1.0KB, used 800.0B, free 224.0B)"));
        assert!(text.contains("/gone: usage unknown"));
        assert!(text.contains("up to 12 log files may be deleted"));
        Ok(())
    }
}
