//! Reversal of base-denominated rates.

use ratebridge_common::{inverse_rate, Currency, Rate, RateNote};
use tracing::{debug, instrument};

/// Reverse `rate` (`X -> base`) into `base -> X`. `None` for a zero rate.
pub fn reverse(rate: &Rate) -> Option<Rate> {
    let value = inverse_rate(rate.value)?;
    Some(Rate::new(
        rate.to.clone(),
        rate.from.clone(),
        value,
        RateNote::Reversed {
            original: rate.value,
        },
    ))
}

/// Emit each rate followed by its reversal when it is quoted against `base`.
///
/// Reversals already present in the input are not emitted again, which makes
/// a second pass over the output a no-op.
#[instrument(skip(rates), fields(rates = rates.len()))]
pub fn rotate(base: &Currency, rates: Vec<Rate>) -> Vec<Rate> {
    let mut out = Vec::with_capacity(rates.len() * 2);
    let mut reversed = 0usize;

    for rate in &rates {
        out.push(rate.clone());

        if &rate.to != base || rates.iter().any(|r| r.covers(base, &rate.from)) {
            continue;
        }

        if let Some(rev) = reverse(rate) {
            out.push(rev);
            reversed += 1;
        }
    }

    debug!(reversed, "Rotation complete");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ratebridge_common::{round_rate, RateKind};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

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

    fn triangulated(from: &str, to: &str, value: Decimal) -> Rate {
        Rate::new(
            Currency::parse(from).unwrap(),
            Currency::parse(to).unwrap(),
            value,
            RateNote::Triangulated {
                base: Currency::eur(),
                from_leg: Decimal::ONE,
                to_leg: Decimal::ONE,
            },
        )
    }

    #[test]
    fn test_reversal_follows_original() {
        let rates = vec![
            direct("USD", dec!(0.9000)),
            triangulated("USD", "GBP", dec!(1.0588)),
            direct("GBP", dec!(0.8500)),
        ];

        let rotated = rotate(&Currency::eur(), rates);

        let pairs: Vec<String> = rotated.iter().map(|r| format!("{}{}", r.from, r.to)).collect();
        assert_eq!(pairs, vec!["USDEUR", "EURUSD", "USDGBP", "GBPEUR", "EURGBP"]);

        assert_eq!(rotated[1].value, dec!(1.1111));
        assert_eq!(rotated[1].kind(), RateKind::Reversed);
        assert_eq!(
            rotated[1].note,
            RateNote::Reversed {
                original: dec!(0.9000)
            }
        );
        assert_eq!(rotated[4].value, dec!(1.1765));
    }

    #[test]
    fn test_zero_rate_is_not_reversed() {
        let rotated = rotate(&Currency::eur(), vec![direct("USD", Decimal::ZERO)]);
        assert_eq!(rotated.len(), 1);
    }

    #[test]
    fn test_second_rotation_is_a_no_op() {
        let once = rotate(
            &Currency::eur(),
            vec![direct("USD", dec!(0.9)), direct("GBP", dec!(0.85))],
        );
        let twice = rotate(&Currency::eur(), once.clone());
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn prop_rotation_is_idempotent(values in prop::collection::vec(1u32..=50_000u32, 1..6)) {
            let codes = ["USD", "GBP", "CHF", "JPY", "SEK"];
            let rates: Vec<Rate> = values
                .iter()
                .zip(codes.iter())
                .map(|(v, code)| direct(code, Decimal::new(*v as i64, 4)))
                .collect();

            let once = rotate(&Currency::eur(), rates);
            let twice = rotate(&Currency::eur(), once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_reversal_round_trips(raw in 500u32..=9_500u32) {
            let v = Decimal::new(raw as i64, 4);
            let rev = reverse(&direct("USD", v)).unwrap();

            prop_assert_eq!(rev.value, round_rate(Decimal::ONE / v));

            let back = inverse_rate(rev.value).unwrap();
            prop_assert!((back - v).abs() <= dec!(0.0001));
        }
    }
}
