//! Resolved, directed exchange rates and their published record form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Currency;

/// How a rate was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateNote {
    /// Mid rate computed from one source quote.
    Direct {
        source: String,
        sell: Decimal,
        buy: Decimal,
    },
    /// Composed through the base currency from two direct legs.
    Triangulated {
        base: Currency,
        /// Direct `from -> base` rate.
        from_leg: Decimal,
        /// Direct `to -> base` rate, inverted to obtain `base -> to`.
        to_leg: Decimal,
    },
    /// Inverse of a base-denominated rate.
    Reversed { original: Decimal },
}

impl RateNote {
    pub fn kind(&self) -> RateKind {
        match self {
            RateNote::Direct { .. } => RateKind::Direct,
            RateNote::Triangulated { .. } => RateKind::Triangulated,
            RateNote::Reversed { .. } => RateKind::Reversed,
        }
    }
}

impl fmt::Display for RateNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateNote::Direct { source, sell, buy } => {
                write!(f, "direct quote from {source} (sell {sell}, buy {buy})")
            }
            RateNote::Triangulated {
                base,
                from_leg,
                to_leg,
            } => write!(f, "triangulated via {base} ({from_leg} x 1/{to_leg})"),
            RateNote::Reversed { original } => write!(f, "reversed from {original}"),
        }
    }
}

/// Provenance category, used for counting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Direct,
    Triangulated,
    Reversed,
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RateKind::Direct => "direct",
            RateKind::Triangulated => "triangulated",
            RateKind::Reversed => "reversed",
        };
        f.write_str(label)
    }
}

/// A directed, fully resolved exchange rate: one unit of `from` buys `value` units of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub from: Currency,
    pub to: Currency,
    /// Rounded to [`crate::RATE_SCALE`] places.
    pub value: Decimal,
    pub note: RateNote,
}

impl Rate {
    pub fn new(from: Currency, to: Currency, value: Decimal, note: RateNote) -> Self {
        debug_assert_ne!(from, to, "a rate must connect two distinct currencies");
        Self {
            from,
            to,
            value,
            note,
        }
    }

    /// Check whether this rate covers the ordered pair `(from, to)`.
    pub fn covers(&self, from: &Currency, to: &Currency) -> bool {
        &self.from == from && &self.to == to
    }

    pub fn kind(&self) -> RateKind {
        self.note.kind()
    }

    /// Flatten into the four-field form handed to sinks and reporters.
    pub fn to_record(&self) -> RateRecord {
        RateRecord {
            from: self.from.code().to_string(),
            to: self.to.code().to_string(),
            value: self.value,
            note: self.note.to_string(),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} {}", self.from, self.to, self.value)
    }
}

/// Published form of a rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    pub from: String,
    pub to: String,
    pub value: Decimal,
    pub note: String,
}
