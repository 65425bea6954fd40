use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use super::iso_date;
use super::rates::{format_iso_date, parse_iso_date, validate_rates, RateTable};
use crate::{CurrencyCode, ValidationError};

/// Full, unpaginated time series as delivered by the upstream.
///
/// Date keys are canonical `YYYY-MM-DD` strings, so lexicographic order is
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub amount: Decimal,
    pub base: CurrencyCode,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub rates: BTreeMap<String, RateTable>,
}

impl HistoricalSeries {
    pub fn new(
        amount: Decimal,
        base: CurrencyCode,
        start_date: Date,
        end_date: Date,
        rates: BTreeMap<String, RateTable>,
    ) -> Result<Self, ValidationError> {
        let mut canonical = BTreeMap::new();
        for (day, table) in rates {
            let date = parse_iso_date(&day)?;
            validate_rates(&table)?;
            canonical.insert(format_iso_date(date), table);
        }

        Ok(Self {
            amount,
            base,
            start_date,
            end_date,
            rates: canonical,
        })
    }

    /// Number of distinct dates in the series.
    pub fn date_count(&self) -> usize {
        self.rates.len()
    }
}

/// Validated pagination input: both values are at least 1 and the page size
/// is clamped to the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::InvalidPage { page });
        }
        if page_size == 0 {
            return Err(ValidationError::InvalidPageSize { page_size });
        }

        Ok(Self {
            page,
            page_size: page_size.min(max_page_size.max(1)),
        })
    }

    pub const fn page(self) -> u32 {
        self.page
    }

    pub const fn page_size(self) -> u32 {
        self.page_size
    }

    /// Zero-based index of the first entry on this page.
    pub fn offset(self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

/// Rates for a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRates {
    pub date: String,
    pub rates: RateTable,
}

/// One page of a historical series, newest date first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPage {
    pub amount: Decimal,
    pub base: CurrencyCode,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub page: u32,
    pub page_size: u32,
    pub total_count: usize,
    pub rates: Vec<DailyRates>,
}

impl HistoricalPage {
    pub fn dates(&self) -> Vec<&str> {
        self.rates.iter().map(|daily| daily.date.as_str()).collect()
    }

    /// Index of the last non-empty page, 0 when the series is empty.
    pub fn last_page(&self) -> u32 {
        let size = self.page_size.max(1) as usize;
        self.total_count.div_ceil(size) as u32
    }
}
