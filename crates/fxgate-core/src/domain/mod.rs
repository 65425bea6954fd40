//! # Domain Models
//!
//! Canonical exchange-rate types shared by the cache, the upstream client and
//! the rate providers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CurrencyCode`] | Validated, uppercased 3-letter code |
//! | [`ExclusionSet`] | Codes refused at the provider boundary |
//! | [`RateSnapshot`] | Latest rates for a base currency |
//! | [`ConversionResult`] | Snapshot plus converted target amount |
//! | [`HistoricalSeries`] | Unpaginated upstream time series |
//! | [`HistoricalPage`] | Newest-first slice of a series |
//! | [`PageRequest`] | Validated page number and size |
//!
//! All constructors validate their invariants and return [`ValidationError`]
//! on failure.
//!
//! [`ValidationError`]: crate::ValidationError

mod currency;
mod history;
mod rates;

// Serde adapter for `YYYY-MM-DD` dates, shared by every dated type.
time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub use currency::{CurrencyCode, ExclusionSet};
pub use history::{DailyRates, HistoricalPage, HistoricalSeries, PageRequest};
pub use rates::{format_iso_date, parse_iso_date, ConversionResult, RateSnapshot, RateTable};
