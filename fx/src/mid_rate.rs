//! Mid-market rates from sell/buy quotes.

use ratebridge_common::{inverse, round_rate, Currency, Quote, Rate, RateNote};
use tracing::{instrument, warn};

use crate::context::RunContext;

/// Direct rates plus the currencies whose quotes could not produce one.
#[derive(Debug, Clone, Default)]
pub struct DirectRates {
    pub rates: Vec<Rate>,
    pub degenerate: Vec<Currency>,
}

/// Compute `quote.currency -> base` as `round4(1 / ((sell + buy) / 2))`.
///
/// Returns `None` when either side is missing, the sides sum to zero or the
/// sum overflows.
pub fn mid_rate(base: &Currency, quote: &Quote) -> Option<Rate> {
    let (sell, buy) = (quote.sell?, quote.buy?);
    let value = round_rate(inverse(quote.mid()?)?);

    Some(Rate::new(
        quote.currency.clone(),
        base.clone(),
        value,
        RateNote::Direct {
            source: quote.source.clone(),
            sell,
            buy,
        },
    ))
}

/// One direct rate per quote, in quote order. Degenerate quotes are dropped and listed.
#[instrument(skip_all, fields(run_id = %ctx.run_id, quotes = quotes.len()))]
pub fn direct_rates(ctx: &RunContext, quotes: &[Quote]) -> DirectRates {
    let mut out = DirectRates::default();

    for quote in quotes {
        match mid_rate(&ctx.base, quote) {
            Some(rate) => out.rates.push(rate),
            None => {
                warn!(quote = %quote, "Degenerate quote, no direct rate");
                out.degenerate.push(quote.currency.clone());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebridge_common::RequiredCurrencies;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mid_rate_value() {
        let quote = Quote::new(Currency::usd(), Some(dec!(1.1000)), Some(dec!(1.0900)), "HB");

        let rate = mid_rate(&Currency::eur(), &quote).unwrap();

        // 1 / 1.095 = 0.913242...
        assert_eq!(rate.from, Currency::usd());
        assert_eq!(rate.to, Currency::eur());
        assert_eq!(rate.value, dec!(0.9132));
        assert_eq!(
            rate.note,
            RateNote::Direct {
                source: "HB".to_string(),
                sell: dec!(1.1000),
                buy: dec!(1.0900),
            }
        );
    }

    #[test]
    fn test_degenerate_quotes_are_dropped() {
        let ctx = RunContext::new(
            Currency::eur(),
            RequiredCurrencies::parse_list("USD,GBP,CHF").unwrap(),
            dec!(5),
        );
        let quotes = vec![
            Quote::new(Currency::usd(), Some(dec!(1.10)), Some(dec!(1.09)), "HB"),
            Quote::new(Currency::gbp(), Some(Decimal::ZERO), Some(Decimal::ZERO), "HB"),
            Quote::new(Currency::parse("CHF").unwrap(), None, Some(dec!(0.95)), "HB"),
        ];

        let direct = direct_rates(&ctx, &quotes);

        assert_eq!(direct.rates.len(), 1);
        assert_eq!(direct.rates[0].from, Currency::usd());
        assert_eq!(direct.degenerate.len(), 2);
        assert_eq!(direct.degenerate[0], Currency::gbp());
    }

    #[test]
    fn test_overflowing_quote_is_degenerate() {
        let ctx = RunContext::new(
            Currency::eur(),
            RequiredCurrencies::parse_list("USD").unwrap(),
            dec!(5),
        );
        let sell = crate::parser::parse_price("79228162514264337593543950335");
        assert_eq!(sell, Some(Decimal::MAX));
        let quotes = vec![Quote::new(Currency::usd(), sell, Some(Decimal::ONE), "HB")];

        let direct = direct_rates(&ctx, &quotes);

        assert!(direct.rates.is_empty());
        assert_eq!(direct.degenerate, vec![Currency::usd()]);
    }
}
