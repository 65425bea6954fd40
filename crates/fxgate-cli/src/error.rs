use fxgate_core::{CoreError, ErrorCategory, RateError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Rate(#[from] RateError),

    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Rate(error) => match error.category() {
                ErrorCategory::Client => 2,
                ErrorCategory::Transient => 3,
                ErrorCategory::Configuration => 4,
            },
            Self::Config(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 5,
        }
    }

    /// Stable machine-readable code for stderr diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rate(error) => error.code(),
            Self::Config(_) => "cli.config",
            Self::Serialization(_) => "cli.serialization",
            Self::Io(_) => "cli.io",
        }
    }
}
