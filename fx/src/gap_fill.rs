//! Completion of the rate table by triangulation through the base currency.
//!
//! Only one hop is attempted: a pair `from -> to` is resolved from the direct
//! legs `from -> base` and `to -> base`. A currency without a direct base rate
//! leaves every pair it takes part in unresolved; no path through a third
//! currency is searched.

use ratebridge_common::{inverse, inverse_rate, round_rate, Currency, Rate, RateNote};
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::context::RunContext;

/// Why a missing pair could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingLeg {
    /// No direct `from -> base` rate.
    From,
    /// No usable direct `to -> base` rate.
    To,
    Both,
    /// Both legs exist but their product is out of range.
    Overflow,
}

/// A required pair left out of the rate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedPair {
    pub from: Currency,
    pub to: Currency,
    pub missing: MissingLeg,
}

impl fmt::Display for UnresolvedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.missing {
            MissingLeg::From => format!("no direct rate for {}", self.from),
            MissingLeg::To => format!("no direct rate for {}", self.to),
            MissingLeg::Both => format!("no direct rate for {} or {}", self.from, self.to),
            MissingLeg::Overflow => "triangulated value out of range".to_string(),
        };
        write!(f, "{}->{} ({})", self.from, self.to, reason)
    }
}

/// Rate table after gap filling.
#[derive(Debug, Clone, Default)]
pub struct GapFill {
    /// Input rates followed by the triangulated ones.
    pub rates: Vec<Rate>,
    pub unresolved: Vec<UnresolvedPair>,
}

fn direct_to_base<'a>(rates: &'a [Rate], currency: &Currency, base: &Currency) -> Option<&'a Rate> {
    rates.iter().find(|r| r.covers(currency, base))
}

/// Triangulate `from -> to` from the direct legs.
///
/// `None` if the `to` leg is zero or the product overflows.
pub fn triangulate(from_leg: &Rate, to_leg: &Rate, base: &Currency) -> Option<Rate> {
    let base_to = inverse(to_leg.value)?;
    let value = round_rate(from_leg.value.checked_mul(base_to)?);

    debug!(
        from = %from_leg.from,
        to = %to_leg.from,
        base_to = ?inverse_rate(to_leg.value),
        value = %value,
        "Triangulated rate"
    );

    Some(Rate::new(
        from_leg.from.clone(),
        to_leg.from.clone(),
        value,
        RateNote::Triangulated {
            base: base.clone(),
            from_leg: from_leg.value,
            to_leg: to_leg.value,
        },
    ))
}

/// Add a triangulated rate for every required non-base pair not already covered.
///
/// Pairs are visited in required-set order, `from` in the outer loop. Each
/// pair depends only on the direct rates, never on rates produced here.
#[instrument(skip_all, fields(run_id = %ctx.run_id, direct = direct.len()))]
pub fn fill_gaps(ctx: &RunContext, direct: Vec<Rate>) -> GapFill {
    let currencies: Vec<&Currency> = ctx.quoted_currencies().collect();
    let mut added: Vec<Rate> = Vec::new();
    let mut unresolved = Vec::new();

    for from in &currencies {
        for to in &currencies {
            if from == to || direct.iter().any(|r| r.covers(from, to)) {
                continue;
            }

            let from_leg = direct_to_base(&direct, from, &ctx.base);
            let to_leg = direct_to_base(&direct, to, &ctx.base);

            let resolved = match (from_leg, to_leg) {
                (Some(a), Some(b)) => triangulate(a, b, &ctx.base),
                _ => None,
            };

            match resolved {
                Some(rate) => added.push(rate),
                None => {
                    let missing = match (from_leg, to_leg) {
                        (None, None) => MissingLeg::Both,
                        (None, Some(_)) => MissingLeg::From,
                        (Some(_), Some(leg)) if !leg.value.is_zero() => MissingLeg::Overflow,
                        _ => MissingLeg::To,
                    };
                    let pair = UnresolvedPair {
                        from: (*from).clone(),
                        to: (*to).clone(),
                        missing,
                    };
                    warn!(pair = %pair, "Unable to resolve missing rate");
                    unresolved.push(pair);
                }
            }
        }
    }

    debug!(added = added.len(), unresolved = unresolved.len(), "Gap filling complete");

    let mut rates = direct;
    rates.extend(added);
    GapFill { rates, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebridge_common::{RateKind, RequiredCurrencies};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ctx(list: &str) -> RunContext {
        RunContext::new(
            Currency::eur(),
            RequiredCurrencies::parse_list(list).unwrap(),
            dec!(5),
        )
    }

    fn direct(code: &str, value: Decimal) -> Rate {
        Rate::new(
            Currency::parse(code).unwrap(),
            Currency::eur(),
            value,
            RateNote::Direct {
                source: "HB".to_string(),
                sell: Decimal::ONE,
                buy: Decimal::ONE,
            },
        )
    }

    #[test]
    fn test_triangulation_value() {
        let fill = fill_gaps(
            &ctx("USD,GBP"),
            vec![direct("USD", dec!(0.9000)), direct("GBP", dec!(0.8500))],
        );

        let usd_gbp = fill
            .rates
            .iter()
            .find(|r| r.covers(&Currency::usd(), &Currency::gbp()))
            .unwrap();
        assert_eq!(usd_gbp.value, dec!(1.0588));
        assert_eq!(usd_gbp.kind(), RateKind::Triangulated);
        assert_eq!(
            usd_gbp.note,
            RateNote::Triangulated {
                base: Currency::eur(),
                from_leg: dec!(0.9000),
                to_leg: dec!(0.8500),
            }
        );

        let gbp_usd = fill
            .rates
            .iter()
            .find(|r| r.covers(&Currency::gbp(), &Currency::usd()))
            .unwrap();
        // 0.85 / 0.90 = 0.94444...
        assert_eq!(gbp_usd.value, dec!(0.9444));
        assert!(fill.unresolved.is_empty());
    }

    #[test]
    fn test_direct_rates_come_first_and_order_follows_required_set() {
        let fill = fill_gaps(
            &ctx("USD,GBP,CHF"),
            vec![
                direct("USD", dec!(0.9)),
                direct("GBP", dec!(1.15)),
                direct("CHF", dec!(1.05)),
            ],
        );

        let pairs: Vec<String> = fill.rates.iter().map(|r| format!("{}{}", r.from, r.to)).collect();
        assert_eq!(
            pairs,
            vec![
                "USDEUR", "GBPEUR", "CHFEUR", "USDGBP", "USDCHF", "GBPUSD", "GBPCHF", "CHFUSD",
                "CHFGBP",
            ]
        );
    }

    #[test]
    fn test_missing_leg_skips_every_pair_of_the_currency() {
        let fill = fill_gaps(
            &ctx("USD,GBP,CHF"),
            vec![direct("USD", dec!(0.9)), direct("GBP", dec!(1.15))],
        );

        let chf = Currency::parse("CHF").unwrap();
        assert!(!fill.rates.iter().any(|r| r.from == chf || r.to == chf));
        assert_eq!(fill.unresolved.len(), 4);
        assert_eq!(
            fill.unresolved[0],
            UnresolvedPair {
                from: Currency::usd(),
                to: chf.clone(),
                missing: MissingLeg::To,
            }
        );
        assert!(fill
            .unresolved
            .iter()
            .any(|p| p.from == chf && p.missing == MissingLeg::From));
    }

    #[test]
    fn test_existing_pairs_are_not_recomputed() {
        let existing = Rate::new(
            Currency::usd(),
            Currency::gbp(),
            dec!(1.2345),
            RateNote::Reversed {
                original: dec!(0.81),
            },
        );
        let fill = fill_gaps(
            &ctx("USD,GBP"),
            vec![direct("USD", dec!(0.9)), direct("GBP", dec!(0.85)), existing.clone()],
        );

        let usd_gbp: Vec<&Rate> = fill
            .rates
            .iter()
            .filter(|r| r.covers(&Currency::usd(), &Currency::gbp()))
            .collect();
        assert_eq!(usd_gbp, vec![&existing]);
    }

    #[test]
    fn test_zero_leg_is_unresolved() {
        let fill = fill_gaps(
            &ctx("USD,GBP"),
            vec![direct("USD", dec!(0.9)), direct("GBP", Decimal::ZERO)],
        );

        assert!(!fill
            .rates
            .iter()
            .any(|r| r.covers(&Currency::usd(), &Currency::gbp())));
        assert_eq!(fill.unresolved[0].missing, MissingLeg::To);
    }

    #[test]
    fn test_out_of_range_product_is_unresolved() {
        let fill = fill_gaps(
            &ctx("USD,GBP"),
            vec![direct("USD", Decimal::MAX), direct("GBP", dec!(0.0001))],
        );

        assert!(!fill
            .rates
            .iter()
            .any(|r| r.covers(&Currency::usd(), &Currency::gbp())));
        assert_eq!(
            fill.unresolved[0],
            UnresolvedPair {
                from: Currency::usd(),
                to: Currency::gbp(),
                missing: MissingLeg::Overflow,
            }
        );
        assert_eq!(
            fill.unresolved[0].to_string(),
            "USD->GBP (triangulated value out of range)"
        );
    }

    #[test]
    fn test_base_in_required_set_is_ignored() {
        let fill = fill_gaps(
            &ctx("EUR,USD,GBP"),
            vec![direct("USD", dec!(0.9)), direct("GBP", dec!(0.85))],
        );

        assert_eq!(fill.rates.len(), 4);
        assert!(fill.unresolved.is_empty());
    }

    #[test]
    fn test_unresolved_display() {
        let pair = UnresolvedPair {
            from: Currency::usd(),
            to: Currency::gbp(),
            missing: MissingLeg::Both,
        };
        assert_eq!(pair.to_string(), "USD->GBP (no direct rate for USD or GBP)");
    }
}
