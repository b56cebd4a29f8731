/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Black-Scholes Greeks evaluator. Parameterised by `(option_type, strike,
//! underlying_price, days_to_expiration, option_price, dividend)`, matching
//! the quote model's construction contract. Missing or non-finite results are
//! reported as `None`, never zero.

use crate::constants::DAYS_IN_A_YEAR;
use crate::greeks::utils::{big_n, d1, d2, n};
use crate::model::positive::Positive;
use crate::model::types::OptionStyle;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The five standard Greeks plus implied volatility, as supplied to the
/// evaluator (this model takes IV as an input rather than solving for it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlackScholesGreeks {
    /// ∂price/∂underlying.
    pub delta: Decimal,
    /// ∂delta/∂underlying.
    pub gamma: Decimal,
    /// ∂price/∂time, per calendar day.
    pub theta: Decimal,
    /// ∂price/∂volatility, per 1.00 (100 vol points) of IV.
    pub vega: Decimal,
    /// ∂price/∂risk_free_rate, per 1.00 (100%) of rate.
    pub rho: Decimal,
    /// The implied volatility the evaluator was given.
    pub iv: Decimal,
}

fn to_f64_checked(value: Decimal) -> Option<f64> {
    let v = value.to_f64()?;
    if v.is_finite() { Some(v) } else { None }
}

fn from_f64_checked(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::try_from(value).ok()
}

/// Computes Greeks for one option leg, or `None` if any input is unusable
/// (non-positive time to expiration, non-finite intermediate values, or a
/// Decimal that cannot represent an f64 result).
#[allow(clippy::too_many_arguments)]
pub fn black_scholes_greeks(
    style: OptionStyle,
    strike: Positive,
    underlying_price: Decimal,
    days_to_expiration: i64,
    _option_price: Decimal,
    risk_free_rate: Decimal,
    implied_volatility: Decimal,
    dividend_yield: Decimal,
) -> Option<BlackScholesGreeks> {
    if days_to_expiration <= 0 {
        return None;
    }
    let s = to_f64_checked(underlying_price)?;
    let k = to_f64_checked(strike.to_dec())?;
    let r = to_f64_checked(risk_free_rate)?;
    let q = to_f64_checked(dividend_yield)?;
    let sigma = to_f64_checked(implied_volatility)?;
    if s <= 0.0 || k <= 0.0 || sigma <= 0.0 {
        return None;
    }
    let t = days_to_expiration as f64 / DAYS_IN_A_YEAR as f64;

    let d1_value = d1(s, k, r - q, t, sigma);
    let d2_value = d2(s, k, r - q, t, sigma);
    if !d1_value.is_finite() || !d2_value.is_finite() {
        return None;
    }

    let discount_r = (-r * t).exp();
    let discount_q = (-q * t).exp();
    let n_d1 = n(d1_value);

    let (delta, rho_sign) = match style {
        OptionStyle::Call => (discount_q * big_n(d1_value), 1.0),
        OptionStyle::Put => (-discount_q * big_n(-d1_value), -1.0),
    };

    let gamma = discount_q * n_d1 / (s * sigma * t.sqrt());
    let vega = s * discount_q * n_d1 * t.sqrt() / 100.0;

    let theta_common = -(s * discount_q * n_d1 * sigma) / (2.0 * t.sqrt());
    let theta = match style {
        OptionStyle::Call => {
            (theta_common - r * k * discount_r * big_n(d2_value)
                + q * s * discount_q * big_n(d1_value))
                / DAYS_IN_A_YEAR as f64
        }
        OptionStyle::Put => {
            (theta_common + r * k * discount_r * big_n(-d2_value)
                - q * s * discount_q * big_n(-d1_value))
                / DAYS_IN_A_YEAR as f64
        }
    };

    let rho = rho_sign * k * t * discount_r * big_n(rho_sign * d2_value) / 100.0;

    Some(BlackScholesGreeks {
        delta: from_f64_checked(delta)?,
        gamma: from_f64_checked(gamma)?,
        theta: from_f64_checked(theta)?,
        vega: from_f64_checked(vega)?,
        rho: from_f64_checked(rho)?,
        iv: implied_volatility,
    })
}
