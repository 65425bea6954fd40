//! Rate provider contract and the caller-facing error taxonomy.
//!
//! # Operations
//!
//! | Method | Result | Failure |
//! |--------|--------|---------|
//! | [`list_currencies`](RateProvider::list_currencies) | code to display name | never; degrades to an empty map |
//! | [`latest_rates`](RateProvider::latest_rates) | [`RateSnapshot`] | [`RateError`] |
//! | [`convert`](RateProvider::convert) | [`ConversionResult`] | [`RateError`] |
//! | [`historical_rates`](RateProvider::historical_rates) | [`HistoricalPage`] | [`RateError`] |

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::upstream::{UpstreamError, UpstreamErrorKind};
use crate::{
    ConversionResult, CurrencyCode, HistoricalPage, ProviderId, RateSnapshot, ValidationError,
};

/// Caller-facing failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateErrorKind {
    RatesUnavailable,
    RatesMalformed,
    CircuitOpen,
    ConversionInvalid,
    UnsupportedCurrency,
    InvalidRequest,
    UnknownProvider,
}

/// Who is at fault, for mapping failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Client,
    Transient,
    Configuration,
}

/// Structured error returned by every fallible provider operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateError {
    kind: RateErrorKind,
    message: String,
}

impl RateError {
    fn new(kind: RateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rates_unavailable(message: impl Into<String>) -> Self {
        Self::new(RateErrorKind::RatesUnavailable, message)
    }

    pub fn rates_malformed(message: impl Into<String>) -> Self {
        Self::new(RateErrorKind::RatesMalformed, message)
    }

    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::new(RateErrorKind::CircuitOpen, message)
    }

    pub fn conversion_invalid(base: &CurrencyCode, target: &CurrencyCode) -> Self {
        Self::new(
            RateErrorKind::ConversionInvalid,
            format!("no {target} rate was returned for base {base}"),
        )
    }

    pub fn unsupported_currency(code: &CurrencyCode) -> Self {
        Self::new(
            RateErrorKind::UnsupportedCurrency,
            format!("currency '{code}' is not supported"),
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RateErrorKind::InvalidRequest, message)
    }

    pub fn unknown_provider(name: &str) -> Self {
        Self::new(
            RateErrorKind::UnknownProvider,
            format!("rate provider '{}' is not registered", name.trim()),
        )
    }

    pub const fn kind(&self) -> RateErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn category(&self) -> ErrorCategory {
        match self.kind {
            RateErrorKind::ConversionInvalid
            | RateErrorKind::UnsupportedCurrency
            | RateErrorKind::InvalidRequest => ErrorCategory::Client,
            RateErrorKind::RatesUnavailable
            | RateErrorKind::RatesMalformed
            | RateErrorKind::CircuitOpen => ErrorCategory::Transient,
            RateErrorKind::UnknownProvider => ErrorCategory::Configuration,
        }
    }

    /// Whether the same request may succeed later without changes.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            RateErrorKind::RatesUnavailable | RateErrorKind::CircuitOpen
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            RateErrorKind::RatesUnavailable => "rates.unavailable",
            RateErrorKind::RatesMalformed => "rates.malformed",
            RateErrorKind::CircuitOpen => "rates.circuit_open",
            RateErrorKind::ConversionInvalid => "rates.conversion_invalid",
            RateErrorKind::UnsupportedCurrency => "rates.unsupported_currency",
            RateErrorKind::InvalidRequest => "rates.invalid_request",
            RateErrorKind::UnknownProvider => "rates.unknown_provider",
        }
    }
}

impl Display for RateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for RateError {}

impl From<UpstreamError> for RateError {
    fn from(error: UpstreamError) -> Self {
        let kind = match error.kind() {
            UpstreamErrorKind::Unavailable | UpstreamErrorKind::Rejected => {
                RateErrorKind::RatesUnavailable
            }
            UpstreamErrorKind::Malformed => RateErrorKind::RatesMalformed,
            UpstreamErrorKind::CircuitOpen => RateErrorKind::CircuitOpen,
        };
        Self::new(kind, error.message())
    }
}

impl From<ValidationError> for RateError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Raw historical query as received from a caller. Validated by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalQuery {
    pub base: String,
    pub start_date: String,
    pub end_date: String,
    pub page: u32,
    pub page_size: u32,
}

impl HistoricalQuery {
    pub fn new(
        base: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

pub type RateFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RateError>> + Send + 'a>>;

/// Capability surface shared by every rate source.
///
/// Currency inputs are raw strings: implementations trim and uppercase
/// them, and reject malformed or excluded codes before any cache or
/// upstream access.
pub trait RateProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Supported currencies with display names. Upstream failures yield an
    /// empty map.
    fn list_currencies<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = BTreeMap<CurrencyCode, String>> + Send + 'a>>;

    /// Latest rates relative to `base`.
    fn latest_rates<'a>(&'a self, base: &'a str) -> RateFuture<'a, RateSnapshot>;

    /// Latest `base` to `target` rate.
    ///
    /// # Errors
    ///
    /// [`RateErrorKind::ConversionInvalid`] when the upstream answer lacks
    /// `target`, even if the call itself succeeded.
    fn convert<'a>(&'a self, base: &'a str, target: &'a str) -> RateFuture<'a, ConversionResult>;

    /// One page of the daily series for the query's date range.
    fn historical_rates<'a>(&'a self, query: HistoricalQuery) -> RateFuture<'a, HistoricalPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_kinds_map_to_caller_kinds() {
        let cases = [
            (UpstreamError::unavailable("down"), RateErrorKind::RatesUnavailable),
            (UpstreamError::from_status(404, ""), RateErrorKind::RatesUnavailable),
            (UpstreamError::malformed("bad json"), RateErrorKind::RatesMalformed),
            (
                UpstreamError::circuit_open(crate::upstream::UpstreamEndpoint::Latest),
                RateErrorKind::CircuitOpen,
            ),
        ];

        for (upstream, expected) in cases {
            assert_eq!(RateError::from(upstream).kind(), expected);
        }
    }

    #[test]
    fn categories_separate_client_transient_and_configuration_failures() {
        let usd = CurrencyCode::parse("USD").expect("valid");
        let eur = CurrencyCode::parse("EUR").expect("valid");

        assert_eq!(
            RateError::unsupported_currency(&usd).category(),
            ErrorCategory::Client
        );
        assert_eq!(
            RateError::conversion_invalid(&eur, &usd).category(),
            ErrorCategory::Client
        );
        assert_eq!(
            RateError::rates_unavailable("x").category(),
            ErrorCategory::Transient
        );
        assert_eq!(RateError::circuit_open("x").category(), ErrorCategory::Transient);
        assert_eq!(
            RateError::unknown_provider("nope").category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn validation_failures_become_invalid_requests() {
        let error = RateError::from(ValidationError::InvalidPage { page: 0 });
        assert_eq!(error.kind(), RateErrorKind::InvalidRequest);
        assert!(!error.retryable());
        assert_eq!(error.code(), "rates.invalid_request");
    }

    #[test]
    fn historical_query_defaults_to_first_page() {
        let query = HistoricalQuery::new("eur", "2024-01-01", "2024-01-31");
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.with_page(3, 10).page_size, 10);
    }
}
