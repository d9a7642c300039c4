//! Normalization of raw source rows into quotes.

use ratebridge_common::{Currency, Quote};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::context::RunContext;
use crate::error::{FxError, FxResult};
use crate::source::{RawRow, SourceLayout};

/// Strip line breaks, collapse whitespace runs to a single space and trim.
pub fn cleanse(field: &str) -> String {
    field.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a price cell. Empty, malformed and non-positive values yield `None`.
///
/// A lone comma is taken as the decimal separator. When both `,` and `.`
/// appear, whichever comes last is the decimal separator and the other one
/// groups thousands (`1,234.56` and `1.234,56` are the same price).
pub fn parse_price(field: &str) -> Option<Decimal> {
    let compact: String = field.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let normalized = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) if dot < comma => compact.replace('.', "").replace(',', "."),
        (Some(_), _) => compact.replace(',', ""),
        (None, _) => compact.replace(',', "."),
    };

    Decimal::from_str(&normalized)
        .ok()
        .filter(|value| value.is_sign_positive() && !value.is_zero())
}

fn cell<'a>(row: &'a RawRow, index: usize) -> &'a str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Turn one source's table rows into quotes for the required currencies.
///
/// Rows whose cleansed currency cell is not a three letter required code are
/// dropped. The first row wins when a currency repeats. Zero surviving quotes
/// is fatal.
#[instrument(
    skip(ctx, rows),
    fields(run_id = %ctx.run_id, source = %layout.name, rows = rows.len())
)]
pub fn parse_quotes(
    ctx: &RunContext,
    layout: &SourceLayout,
    rows: &[RawRow],
) -> FxResult<Vec<Quote>> {
    let mut quotes: Vec<Quote> = Vec::new();

    for row in rows {
        let code = cleanse(cell(row, layout.currency_column)).to_uppercase();
        if code.chars().count() != 3 || !ctx.is_quoted_code(&code) {
            continue;
        }

        let currency = match Currency::parse(&code) {
            Ok(currency) => currency,
            Err(_) => continue,
        };

        if quotes.iter().any(|q| q.currency == currency) {
            debug!(currency = %currency, "Duplicate currency row ignored");
            continue;
        }

        let sell = parse_price(&cleanse(cell(row, layout.sell_column)));
        let buy = parse_price(&cleanse(cell(row, layout.buy_column)));
        quotes.push(Quote::new(currency, sell, buy, layout.name.clone()));
    }

    if quotes.is_empty() {
        return Err(FxError::EmptySource(layout.name.clone()));
    }

    debug!(quotes = quotes.len(), "Parsed source quotes");
    Ok(quotes)
}
