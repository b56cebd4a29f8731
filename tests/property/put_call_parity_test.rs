//! Property-based tests for the put-call parity identities that hold on the
//! Greeks themselves (this crate derives Greeks from a quote; it has no
//! theoretical option-pricing model to test price-level parity against).
//!
//! With zero dividend yield, put-call parity on the underlying gives:
//! `delta_call - delta_put = 1` and `rho_call >= 0 >= rho_put`.

use paperbroker::greeks::black_scholes_greeks;
use paperbroker::model::positive::Positive;
use paperbroker::model::types::OptionStyle;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[allow(clippy::too_many_arguments)]
fn greeks_for(
    style: OptionStyle,
    spot: f64,
    strike: f64,
    volatility: f64,
    days: i64,
    rate: f64,
) -> Option<paperbroker::greeks::BlackScholesGreeks> {
    let strike = Positive::new(Decimal::try_from(strike).unwrap()).unwrap();
    black_scholes_greeks(
        style,
        strike,
        Decimal::try_from(spot).unwrap(),
        days,
        Decimal::ZERO,
        Decimal::try_from(rate).unwrap(),
        Decimal::try_from(volatility).unwrap(),
        Decimal::ZERO,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// `delta_call - delta_put == 1` when there is no dividend yield.
    #[test]
    fn test_delta_put_call_parity(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
        rate in 0.01f64..0.10,
    ) {
        if let (Some(call), Some(put)) = (
            greeks_for(OptionStyle::Call, spot, strike, volatility, days, rate),
            greeks_for(OptionStyle::Put, spot, strike, volatility, days, rate),
        ) {
            let diff = (call.delta - put.delta - dec!(1.0)).abs();
            prop_assert!(
                diff < dec!(0.0001),
                "delta parity violated: call={} put={} diff={}",
                call.delta, put.delta, diff
            );
        }
    }

    /// Call rho is never negative; put rho is never positive.
    #[test]
    fn test_rho_signs(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
        rate in 0.01f64..0.10,
    ) {
        if let Some(call) = greeks_for(OptionStyle::Call, spot, strike, volatility, days, rate) {
            prop_assert!(call.rho >= dec!(0.0), "call rho should be non-negative, got {}", call.rho);
        }
        if let Some(put) = greeks_for(OptionStyle::Put, spot, strike, volatility, days, rate) {
            prop_assert!(put.rho <= dec!(0.0), "put rho should be non-positive, got {}", put.rho);
        }
    }

    /// Call and put share the same implied volatility they were given back.
    #[test]
    fn test_iv_echoed_unchanged(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let Some(greeks) = greeks_for(OptionStyle::Call, spot, strike, volatility, days, 0.05) {
            let expected = Decimal::try_from(volatility).unwrap();
            prop_assert_eq!(greeks.iv, expected);
        }
    }
}
