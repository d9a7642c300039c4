//! Quotes as published by a source bank.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Currency;

/// One bank's published price for one currency against the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Quoted currency, always a member of the required set.
    pub currency: Currency,
    /// Selling price, `None` when the cell was empty or malformed.
    pub sell: Option<Decimal>,
    /// Buying price, `None` when the cell was empty or malformed.
    pub buy: Option<Decimal>,
    /// Name of the feed this quote came from.
    pub source: String,
}

impl Quote {
    /// Create a new quote.
    pub fn new(
        currency: Currency,
        sell: Option<Decimal>,
        buy: Option<Decimal>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            currency,
            sell,
            buy,
            source: source.into(),
        }
    }

    /// Average of sell and buy, if both are present and their sum is non-zero
    /// and representable.
    pub fn mid(&self) -> Option<Decimal> {
        let combined = self.sell?.checked_add(self.buy?)?;
        if combined.is_zero() {
            return None;
        }
        combined.checked_div(Decimal::TWO)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(value: &Option<Decimal>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "{} sell={} buy={} ({})",
            self.currency,
            side(&self.sell),
            side(&self.buy),
            self.source
        )
    }
}
