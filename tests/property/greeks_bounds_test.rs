//! Property-based tests for Greeks bounds
//!
//! This module tests that the Greeks (delta, gamma, theta, vega, rho)
//! stay within their theoretical bounds across a wide range of inputs.

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
) -> Option<paperbroker::greeks::BlackScholesGreeks> {
    let strike = Positive::new(Decimal::try_from(strike).unwrap()).unwrap();
    black_scholes_greeks(
        style,
        strike,
        Decimal::try_from(spot).unwrap(),
        days,
        Decimal::ZERO,
        dec!(0.05),
        Decimal::try_from(volatility).unwrap(),
        Decimal::ZERO,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Call delta stays in [0, 1].
    #[test]
    fn test_call_delta_bounds(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let Some(greeks) = greeks_for(OptionStyle::Call, spot, strike, volatility, days) {
            prop_assert!(
                greeks.delta >= dec!(0.0) && greeks.delta <= dec!(1.0),
                "call delta should be in [0, 1], got {}",
                greeks.delta
            );
        }
    }

    /// Put delta stays in [-1, 0].
    #[test]
    fn test_put_delta_bounds(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let Some(greeks) = greeks_for(OptionStyle::Put, spot, strike, volatility, days) {
            prop_assert!(
                greeks.delta >= dec!(-1.0) && greeks.delta <= dec!(0.0),
                "put delta should be in [-1, 0], got {}",
                greeks.delta
            );
        }
    }

    /// Gamma is never negative.
    #[test]
    fn test_gamma_non_negative(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let Some(greeks) = greeks_for(OptionStyle::Call, spot, strike, volatility, days) {
            prop_assert!(greeks.gamma >= dec!(0.0), "gamma should be non-negative, got {}", greeks.gamma);
        }
    }

    /// Vega is never negative for a long option.
    #[test]
    fn test_vega_non_negative(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let Some(greeks) = greeks_for(OptionStyle::Call, spot, strike, volatility, days) {
            prop_assert!(greeks.vega >= dec!(0.0), "vega should be non-negative, got {}", greeks.vega);
        }
    }

    /// Call and put share gamma at the same strike/spot/vol/DTE.
    #[test]
    fn test_call_put_same_gamma(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let (Some(call), Some(put)) = (
            greeks_for(OptionStyle::Call, spot, strike, volatility, days),
            greeks_for(OptionStyle::Put, spot, strike, volatility, days),
        ) {
            let diff = (call.gamma - put.gamma).abs();
            prop_assert!(diff < dec!(0.0001), "call/put gamma should match: {} vs {}", call.gamma, put.gamma);
        }
    }

    /// Call and put share vega at the same strike/spot/vol/DTE.
    #[test]
    fn test_call_put_same_vega(
        spot in 50.0f64..500.0,
        strike in 50.0f64..500.0,
        volatility in 0.1f64..0.8,
        days in 7i64..365,
    ) {
        if let (Some(call), Some(put)) = (
            greeks_for(OptionStyle::Call, spot, strike, volatility, days),
            greeks_for(OptionStyle::Put, spot, strike, volatility, days),
        ) {
            let diff = (call.vega - put.vega).abs();
            prop_assert!(diff < dec!(0.0001), "call/put vega should match: {} vs {}", call.vega, put.vega);
        }
    }

    /// Delta's change over a one-unit spot bump is close to gamma (finite-difference check).
    #[test]
    fn test_delta_gamma_relationship(
        spot in 100.0f64..400.0,
        strike in 100.0f64..400.0,
        volatility in 0.1f64..0.8,
        days in 30i64..365,
    ) {
        if let (Some(low), Some(high)) = (
            greeks_for(OptionStyle::Call, spot, strike, volatility, days),
            greeks_for(OptionStyle::Call, spot + 1.0, strike, volatility, days),
        ) {
            let delta_change = high.delta - low.delta;
            let diff = (delta_change - low.gamma).abs();
            prop_assert!(
                diff < dec!(0.1),
                "delta change ({}) should be close to gamma ({})",
                delta_change, low.gamma
            );
        }
    }
}
