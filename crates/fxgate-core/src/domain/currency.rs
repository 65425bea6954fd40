use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const CURRENCY_CODE_LEN: usize = 3;

/// Normalized ISO 4217 style currency code (`USD`, `EUR`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalize a currency code to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCurrency);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let valid = normalized.len() == CURRENCY_CODE_LEN
            && normalized.chars().all(|ch| ch.is_ascii_uppercase());
        if !valid {
            return Err(ValidationError::InvalidCurrency {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// Currency codes the service refuses to quote (non-convertible or unsupported).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    codes: BTreeSet<CurrencyCode>,
}

impl ExclusionSet {
    pub fn new(codes: impl IntoIterator<Item = CurrencyCode>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// Parse a list of raw codes, failing on the first malformed entry.
    pub fn parse<I, S>(codes: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codes
            .into_iter()
            .map(|code| CurrencyCode::parse(code.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(|codes| Self { codes })
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.codes.contains(code)
    }

    /// Check a raw (case-insensitive) code against the set.
    pub fn contains_raw(&self, code: &str) -> bool {
        self.codes
            .iter()
            .any(|excluded| excluded.as_str().eq_ignore_ascii_case(code.trim()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.codes.iter()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
