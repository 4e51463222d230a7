//! CLI error type and exit-code mapping.

use std::fmt::{self, Display, Formatter};

use logtrim_core::RetentionError;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 1,
            Self::Failure(_) => 2,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<RetentionError> for CliError {
    fn from(error: RetentionError) -> Self {
        if error.is_validation() {
            Self::validation(describe_validation(&error))
        } else {
            Self::failure(error)
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

fn describe_validation(error: &RetentionError) -> String {
    match error {
        RetentionError::InvalidInput { reason, value, .. } => {
            let value = value.as_deref().unwrap_or_default();
            match *reason {
                "not_found" => format!("directory does not exist: {value}"),
                "not_a_directory" => format!("not a directory: {value}"),
                "empty" => "no directories given (separate multiple directories with ':')".to_string(),
                other => format!("invalid directories ({other}): {value}"),
            }
        }
        RetentionError::InvalidPolicy { field, value, .. } => format!(
            "{field} must be an integer between 1 and 99 (got {})",
            value.as_deref().unwrap_or_default()
        ),
        other => other.to_string(),
    }
}
