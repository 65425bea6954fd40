use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use super::iso_date;
use crate::{CurrencyCode, ValidationError};

/// Currency code to decimal factor, relative to a base currency.
pub type RateTable = BTreeMap<CurrencyCode, Decimal>;

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(value: &str) -> Result<Date, ValidationError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: value.trim().to_owned(),
        }
    })
}

/// Render a calendar date as `YYYY-MM-DD`.
pub fn format_iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub(crate) fn validate_rates(rates: &RateTable) -> Result<(), ValidationError> {
    match rates.iter().find(|(_, factor)| **factor <= Decimal::ZERO) {
        Some((currency, _)) => Err(ValidationError::NonPositiveRate {
            currency: currency.to_string(),
        }),
        None => Ok(()),
    }
}

/// Latest rates for a base currency on a given business day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub amount: Decimal,
    pub base: CurrencyCode,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub rates: RateTable,
}

impl RateSnapshot {
    pub fn new(
        amount: Decimal,
        base: CurrencyCode,
        date: Date,
        rates: RateTable,
    ) -> Result<Self, ValidationError> {
        validate_rates(&rates)?;
        Ok(Self {
            amount,
            base,
            date,
            rates,
        })
    }

    pub fn rate(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }
}

/// Snapshot restricted to a conversion target, with the converted amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    #[serde(flatten)]
    pub snapshot: RateSnapshot,
    pub target: CurrencyCode,
    pub converted_amount: Decimal,
}

impl ConversionResult {
    /// Fails when `target` has no rate in the snapshot.
    ///
    /// Upstream rates are already scaled by `snapshot.amount`, so the converted
    /// amount is the target's factor as delivered.
    pub fn new(snapshot: RateSnapshot, target: CurrencyCode) -> Result<Self, ValidationError> {
        let converted_amount =
            snapshot
                .rate(&target)
                .ok_or_else(|| ValidationError::MissingTargetRate {
                    target: target.to_string(),
                })?;

        Ok(Self {
            snapshot,
            target,
            converted_amount,
        })
    }

    /// Rate for one unit of the base currency.
    pub fn unit_rate(&self) -> Decimal {
        if self.snapshot.amount.is_zero() {
            return self.converted_amount;
        }
        self.converted_amount / self.snapshot.amount
    }

    /// Convert an arbitrary amount of the base currency into the target.
    pub fn convert(&self, amount: Decimal) -> Decimal {
        amount * self.unit_rate()
    }
}
