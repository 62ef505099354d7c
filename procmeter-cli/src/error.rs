//! CLI-specific error types and exit code mapping

use procmeter_core::error::ProcmeterError;
use procmeter_engine::ProcEngineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from procmeter-core.
    #[error("{0}")]
    Core(#[from] ProcmeterError),

    /// Rule loading or validation error.
    #[error("rule error: {0}")]
    Rule(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                  |
    /// |------|--------------------------|
    /// | 0    | Success                  |
    /// | 1    | General / command error  |
    /// | 2    | Configuration error      |
    /// | 3    | Rule error               |
    /// | 10   | IO error                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Rule(_) => 3,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                ProcmeterError::Config(_) => 2,
                ProcmeterError::Rule(_) => 3,
                ProcmeterError::Io(_) => 10,
                ProcmeterError::Collector(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<ProcEngineError> for CliError {
    fn from(e: ProcEngineError) -> Self {
        match e {
            ProcEngineError::RuleLoad { .. } | ProcEngineError::RuleValidation { .. } => {
                Self::Rule(e.to_string())
            }
            ProcEngineError::Config { .. } => Self::Config(e.to_string()),
            ProcEngineError::Io(io) => Self::Io(io),
            ProcEngineError::Collector { .. } => Self::Command(e.to_string()),
        }
    }
}
