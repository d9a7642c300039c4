//! Cross-source validation of quotes.

use ratebridge_common::{Currency, Quote};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::context::RunContext;
use crate::error::{FxError, FxResult, QuoteSide};

/// Divergence observed for one currency quoted by both sources, in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub currency: Currency,
    /// `None` when the side could not be compared.
    pub sell_diff_pct: Option<Decimal>,
    pub buy_diff_pct: Option<Decimal>,
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub primary: String,
    pub secondary: String,
    pub divergences: Vec<Divergence>,
}

impl ValidationReport {
    /// Largest divergence across all compared sides.
    pub fn max_diff_pct(&self) -> Option<Decimal> {
        self.divergences
            .iter()
            .flat_map(|d| [d.sell_diff_pct, d.buy_diff_pct])
            .flatten()
            .max()
    }
}

/// `|a - b| * 100 / a`. `None` when either side is missing or `a` is zero.
///
/// A divergence too large to represent saturates at [`Decimal::MAX`].
pub fn diff_pct(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    let (a, b) = (a?, b?);
    if a.is_zero() {
        return None;
    }
    let diff = a
        .checked_sub(b)
        .map(|d| d.abs())
        .and_then(|d| d.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|d| d.checked_div(a));
    Some(diff.unwrap_or(Decimal::MAX))
}

/// Compare the two sources for every currency both of them quote.
///
/// Fails with [`FxError::ToleranceExceeded`] on the first side whose
/// divergence is strictly above the run's tolerance.
#[instrument(skip_all, fields(run_id = %ctx.run_id, tolerance_pct = %ctx.tolerance_pct))]
pub fn cross_validate(
    ctx: &RunContext,
    primary: &[Quote],
    secondary: &[Quote],
) -> FxResult<ValidationReport> {
    let mut report = ValidationReport {
        primary: source_name(primary),
        secondary: source_name(secondary),
        divergences: Vec::new(),
    };

    for a in primary {
        let Some(b) = secondary.iter().find(|q| q.currency == a.currency) else {
            debug!(currency = %a.currency, "Only quoted by primary source, not compared");
            continue;
        };

        let sell_diff_pct = diff_pct(a.sell, b.sell);
        let buy_diff_pct = diff_pct(a.buy, b.buy);

        for (side, diff) in [(QuoteSide::Sell, sell_diff_pct), (QuoteSide::Buy, buy_diff_pct)] {
            match diff {
                Some(diff) if diff > ctx.tolerance_pct => {
                    let diff_pct = diff.round_dp(2);
                    error!(
                        currency = %a.currency,
                        side = %side,
                        diff_pct = %diff_pct,
                        "Sources diverge beyond tolerance"
                    );
                    return Err(FxError::ToleranceExceeded {
                        currency: a.currency.clone(),
                        side,
                        primary: a.source.clone(),
                        secondary: b.source.clone(),
                        diff_pct,
                        tolerance_pct: ctx.tolerance_pct,
                    });
                }
                Some(_) => {}
                None => warn!(currency = %a.currency, side = %side, "Side not comparable"),
            }
        }

        debug!(
            currency = %a.currency,
            sell_diff_pct = ?sell_diff_pct,
            buy_diff_pct = ?buy_diff_pct,
            "Sources agree"
        );
        report.divergences.push(Divergence {
            currency: a.currency.clone(),
            sell_diff_pct,
            buy_diff_pct,
        });
    }

    Ok(report)
}

fn source_name(quotes: &[Quote]) -> String {
    quotes.first().map(|q| q.source.clone()).unwrap_or_default()
}
