use thiserror::Error;

/// Validation and contract errors exposed by `fxgate-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("currency code cannot be empty")]
    EmptyCurrency,
    #[error("currency must be a 3-letter ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("page must be at least 1, got {page}")]
    InvalidPage { page: u32 },
    #[error("page size must be at least 1, got {page_size}")]
    InvalidPageSize { page_size: u32 },

    #[error("rate for '{currency}' must be positive")]
    NonPositiveRate { currency: String },
    #[error("rates do not contain target currency '{target}'")]
    MissingTargetRate { target: String },

    #[error("invalid provider '{value}', expected one of: frankfurter")]
    InvalidProvider { value: String },

    #[error("setting '{field}' is invalid: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// Top-level error type for core operations that are not rate lookups.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
