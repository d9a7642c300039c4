//! Currency codes and the statically configured set of required currencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not a usable ISO 4217 style code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code: {0:?}")]
pub struct InvalidCurrencyCode(pub String);

/// Three-letter currency code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a code, uppercasing it. Fails unless it is exactly three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, InvalidCurrencyCode> {
        let upper = code.trim().to_uppercase();
        if upper.len() == 3 && upper.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(upper))
        } else {
            Err(InvalidCurrencyCode(code.to_string()))
        }
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn gbp() -> Self {
        Self("GBP".to_string())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::eur()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = InvalidCurrencyCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Ordered, duplicate-free set of currencies that must be covered by the final
/// rate table.
///
/// Order is significant: it drives the order in which missing pairs are
/// resolved and therefore the order of the published records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCurrencies {
    codes: Vec<Currency>,
}

impl RequiredCurrencies {
    /// Build from an iterator of currencies, keeping the first occurrence of each.
    pub fn new(currencies: impl IntoIterator<Item = Currency>) -> Self {
        let mut codes: Vec<Currency> = Vec::new();
        for currency in currencies {
            if !codes.contains(&currency) {
                codes.push(currency);
            }
        }
        Self { codes }
    }

    /// Parse a comma separated list such as `"USD, GBP,chf"`.
    pub fn parse_list(list: &str) -> Result<Self, InvalidCurrencyCode> {
        let codes = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Currency::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(codes))
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.codes.contains(currency)
    }

    /// Check membership by raw, already uppercased code.
    pub fn contains_code(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c.code() == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.codes.iter()
    }

    /// The required currencies other than `base`, in configured order.
    pub fn quoted_against<'a>(&'a self, base: &'a Currency) -> impl Iterator<Item = &'a Currency> {
        self.codes.iter().filter(move |c| *c != base)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl fmt::Display for RequiredCurrencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.codes.iter().map(Currency::code).collect();
        write!(f, "{}", codes.join(","))
    }
}
