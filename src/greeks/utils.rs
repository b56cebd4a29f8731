/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

use crate::constants::{INFINITY_NEGATIVE, INFINITY_POSITIVE, ZERO};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

/// Evaluates the option payoff based on comparative values of the underlying price and strike price.
///
/// # Arguments
///
/// * `underlying_price` - The current price of the underlying asset.
/// * `strike_price` - The strike price of the option.
///
/// # Returns
///
/// * Returns positive infinity if the `underlying_price` is greater than the `strike_price`.
/// * Returns negative infinity if the `underlying_price` is less than the `strike_price`.
/// * Returns zero if the `underlying_price` is equal to the `strike_price`.
///
fn handle_zero(underlying_price: f64, strike_price: f64) -> f64 {
    if underlying_price > strike_price {
        INFINITY_POSITIVE
    } else if underlying_price < strike_price {
        INFINITY_NEGATIVE
    } else {
        ZERO
    }
}

/// Calculates the d1 component used in the Black-Scholes option pricing model.
///
/// # Arguments
///
/// * `s` - Current stock price
/// * `r` - Risk-free rate
/// * `t` - Time to expiration in years
/// * `sigma` - Volatility of the stock
///
/// # Returns
///
/// * `f64` - The computed d1 value
///
/// d1 is a crucial component in the Black-Scholes model, vital for determining
/// the price of options. It takes into account factors such as the current stock
/// price, risk-free rate, time to expiration, and stock volatility to produce
/// an important intermediate result.
pub(crate) fn d1(
    underlying_price: f64,
    strike_price: f64,
    risk_free_rate: f64,
    expiration_date: f64,
    implied_volatility: f64,
) -> f64 {
    if implied_volatility == ZERO || expiration_date == ZERO {
        return handle_zero(underlying_price, strike_price);
    }
    ((underlying_price / strike_price).ln()
        + (risk_free_rate + implied_volatility * implied_volatility / 2.0) * expiration_date)
        / (implied_volatility * expiration_date.sqrt())
}

/// Calculates the d2 value commonly used in financial mathematics, specifically in
/// the Black-Scholes option pricing model. The d2 value is derived from the d1
/// value and is used to determine the probability of the option ending up in-the-money.
///
/// # Arguments
///
/// * `s` - The current stock price.
/// * `r` - The risk-free interest rate.
/// * `t` - The time to expiration (in years).
/// * `sigma` - The volatility of the stock's returns.
///
/// # Returns
///
/// * `f64` - The computed d2 value.
pub(crate) fn d2(
    underlying_price: f64,
    strike_price: f64,
    risk_free_rate: f64,
    expiration_date: f64,
    implied_volatility: f64,
) -> f64 {
    if implied_volatility == ZERO || expiration_date == ZERO {
        return handle_zero(underlying_price, strike_price);
    }
    d1(
        underlying_price,
        strike_price,
        risk_free_rate,
        expiration_date,
        implied_volatility,
    ) - implied_volatility * expiration_date.sqrt()
}

/// Calculates the value of the standard normal distribution density function at a given point `x`.
///
/// The formula used is:
/// \[
/// f(x) = \frac{1}{\sqrt{2\pi}} e^{-\frac{x^2}{2}}
/// \]
///
/// # Arguments
///
/// * `x` - A floating point number representing the point at which to evaluate the density function.
///
/// # Returns
///
/// A floating point number representing the value of the density function at point `x`.
///
#[allow(dead_code)]
pub(crate) fn n(x: f64) -> f64 {
    1.0 / (2.0 * PI).sqrt() * (-x * x / 2.0).exp()
}

/// Calculate the derivative of the function `n` at a given point `x`.
///
/// This function represents the negative product of `x` and the result of the
/// function `n` evaluated at `x`.
///
/// # Arguments
///
/// * `x` - A floating point number representing the input to the function `n`.
///
/// # Returns
///
/// This function returns a `f64` which is the derivative of the function `n` at `x`.
///
#[allow(dead_code)]
pub(crate) fn n_prime(x: f64) -> f64 {
    -x * n(x)
}

/// Computes the cumulative distribution function (CDF) of the standard normal distribution
/// for a given value `x`.
///
/// # Arguments
///
/// * `x` - A floating-point number for which to compute the CDF of the standard normal distribution.
///
/// # Returns
///
/// A floating-point number representing the CDF of the standard normal distribution at the given `x`.
///
pub fn big_n(x: f64) -> f64 {
    const MEAN: f64 = 0.0;
    const STD_DEV: f64 = 1.0;

    let normal_distribution = Normal::new(MEAN, STD_DEV).unwrap();
    normal_distribution.cdf(x)
}
