//! CLI-specific error types and exit code mapping

use terracycle_core::error::TerracycleError;
use terracycle_harness::HarnessError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The account context could not be resolved.
    #[error("account probe failed: {0}")]
    Probe(String),

    /// At least one scenario did not pass.
    #[error("{failed} of {total} scenario(s) failed")]
    ScenarioFailures { failed: usize, total: usize },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from terracycle-core.
    #[error("{0}")]
    Core(#[from] TerracycleError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Account probe failed             |
    /// | 4    | One or more scenarios failed     |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(TerracycleError::Config(_)) => 2,
            Self::Probe(_) => 3,
            Self::ScenarioFailures { .. } => 4,
            Self::Io(_) | Self::Core(TerracycleError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Probe(reason) => Self::Probe(reason),
            HarnessError::Config { .. } => Self::Config(err.to_string()),
            other => Self::Command(other.to_string()),
        }
    }
}
