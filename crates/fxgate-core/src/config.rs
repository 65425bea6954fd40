//! Runtime settings for providers, cache, resilience and pagination.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `FXGATE_*` environment variables. Callers may override fields afterwards
//! (the CLI applies its flags last) and must call [`Settings::validate`].
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FXGATE_API_URL` | `upstream.api_url` |
//! | `FXGATE_HISTORY_URL` | `upstream.history_url` |
//! | `FXGATE_TIMEOUT_MS` | `upstream.timeout_ms` |
//! | `FXGATE_CACHE_TTL_SECS` | every `cache.*_ttl_secs` |
//! | `FXGATE_RETRY_BACKOFF` | `resilience.backoff` (`fixed` or `exponential`) |
//! | `FXGATE_MAX_PAGE_SIZE` | `pagination.max_page_size` |
//! | `FXGATE_EXCLUDED_CURRENCIES` | `excluded_currencies` (comma separated) |

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::retry::RetryConfig;
use crate::{CoreError, ExclusionSet, ValidationError};

pub const DEFAULT_API_URL: &str = "https://api.frankfurter.dev/v1";
pub const DEFAULT_HISTORY_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Base for `/currencies` and `/latest`.
    pub api_url: String,
    /// Base for `/{start}..{end}` time series.
    pub history_url: String,
    pub timeout_ms: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_url: String::from(DEFAULT_API_URL),
            history_url: String::from(DEFAULT_HISTORY_URL),
            timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub latest_ttl_secs: u64,
    pub convert_ttl_secs: u64,
    pub currencies_ttl_secs: u64,
    pub historical_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            latest_ttl_secs: 3_600,
            convert_ttl_secs: 3_600,
            currencies_ttl_secs: 3_600,
            historical_ttl_secs: 3_600,
        }
    }
}

impl CacheSettings {
    pub fn uniform(ttl_secs: u64) -> Self {
        Self {
            latest_ttl_secs: ttl_secs,
            convert_ttl_secs: ttl_secs,
            currencies_ttl_secs: ttl_secs,
            historical_ttl_secs: ttl_secs,
        }
    }

    pub const fn latest_ttl(&self) -> Duration {
        Duration::from_secs(self.latest_ttl_secs)
    }

    pub const fn convert_ttl(&self) -> Duration {
        Duration::from_secs(self.convert_ttl_secs)
    }

    pub const fn currencies_ttl(&self) -> Duration {
        Duration::from_secs(self.currencies_ttl_secs)
    }

    pub const fn historical_ttl(&self) -> Duration {
        Duration::from_secs(self.historical_ttl_secs)
    }
}

/// Delay shape between retry attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// `retry_delay_ms` before every retry.
    #[default]
    Fixed,
    /// `retry_delay_ms` doubled per retry, jittered, capped at `max_retry_delay_ms`.
    Exponential,
}

impl FromStr for BackoffKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(invalid(
                "FXGATE_RETRY_BACKOFF",
                format!("expected 'fixed' or 'exponential', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub retry_delay_ms: u64,
    /// Only read by exponential backoff.
    pub max_retry_delay_ms: u64,
    pub failure_threshold: u32,
    pub open_timeout_secs: u64,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Fixed,
            retry_delay_ms: 2_000,
            max_retry_delay_ms: 8_000,
            failure_threshold: 3,
            open_timeout_secs: 30,
        }
    }
}

impl ResilienceSettings {
    pub fn retry_config(&self) -> RetryConfig {
        let delay = Duration::from_millis(self.retry_delay_ms);
        match self.backoff {
            BackoffKind::Fixed => RetryConfig::fixed(delay, self.max_attempts),
            BackoffKind::Exponential => RetryConfig::exponential(
                delay,
                Duration::from_millis(self.max_retry_delay_ms),
                self.max_attempts,
            ),
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            open_timeout: Duration::from_secs(self.open_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub resilience: ResilienceSettings,
    pub pagination: PaginationSettings,
    pub excluded_currencies: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upstream: UpstreamSettings::default(),
            cache: CacheSettings::default(),
            resilience: ResilienceSettings::default(),
            pagination: PaginationSettings::default(),
            excluded_currencies: ["TRY", "PLN", "THB", "MXN"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Settings {
    /// Defaults, then the optional JSON file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let settings = settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read a JSON settings file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overlay `FXGATE_*` variables resolved through `lookup`.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FXGATE_API_URL") {
            self.upstream.api_url = value;
        }
        if let Some(value) = lookup("FXGATE_HISTORY_URL") {
            self.upstream.history_url = value;
        }
        if let Some(value) = lookup("FXGATE_TIMEOUT_MS") {
            self.upstream.timeout_ms = parse_number("FXGATE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("FXGATE_CACHE_TTL_SECS") {
            self.cache = CacheSettings::uniform(parse_number("FXGATE_CACHE_TTL_SECS", &value)?);
        }
        if let Some(value) = lookup("FXGATE_RETRY_BACKOFF") {
            self.resilience.backoff = value.parse()?;
        }
        if let Some(value) = lookup("FXGATE_MAX_PAGE_SIZE") {
            self.pagination.max_page_size = parse_number("FXGATE_MAX_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("FXGATE_EXCLUDED_CURRENCIES") {
            self.excluded_currencies = value
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.upstream.api_url.trim().is_empty() {
            return Err(invalid("upstream.api_url", "must not be empty"));
        }
        if self.upstream.history_url.trim().is_empty() {
            return Err(invalid("upstream.history_url", "must not be empty"));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(invalid("upstream.timeout_ms", "must be greater than zero"));
        }
        if self.resilience.max_attempts == 0 {
            return Err(invalid("resilience.max_attempts", "must be at least 1"));
        }
        if self.resilience.backoff == BackoffKind::Exponential
            && self.resilience.max_retry_delay_ms < self.resilience.retry_delay_ms
        {
            return Err(invalid(
                "resilience.max_retry_delay_ms",
                "must not be below resilience.retry_delay_ms",
            ));
        }
        if self.resilience.failure_threshold == 0 {
            return Err(invalid("resilience.failure_threshold", "must be at least 1"));
        }
        if self.pagination.max_page_size == 0 {
            return Err(invalid("pagination.max_page_size", "must be at least 1"));
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            return Err(invalid(
                "pagination.default_page_size",
                format!("must be between 1 and {}", self.pagination.max_page_size),
            ));
        }
        self.exclusion_set()?;
        Ok(())
    }

    pub fn exclusion_set(&self) -> Result<ExclusionSet, ValidationError> {
        ExclusionSet::parse(&self.excluded_currencies)
    }
}

fn parse_number<T: FromStr>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(field, format!("expected a non-negative integer, got '{value}'")))
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidSetting {
        field,
        reason: reason.into(),
    }
}
