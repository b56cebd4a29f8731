/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Quote model: bid/ask/last plus, for options, Greeks derived on construction
//! via a Black-Scholes evaluator.

use crate::greeks::black_scholes::{BlackScholesGreeks, black_scholes_greeks};
use crate::model::asset::{Asset, days_to_expiration, extrinsic_value, intrinsic_value};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A market quote for one asset as of `quote_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    /// The quoted asset.
    pub asset: Asset,
    /// Timestamp the quote was observed.
    pub quote_date: NaiveDateTime,
    /// Best bid, if any.
    pub bid: Option<Decimal>,
    /// Best ask, if any.
    pub ask: Option<Decimal>,
    /// Last traded price, if any.
    pub last: Option<Decimal>,
    /// Size at the best bid.
    pub bid_size: Option<u64>,
    /// Size at the best ask.
    pub ask_size: Option<u64>,
    /// Traded volume for the session.
    pub volume: Option<u64>,
    /// Concurrent price of the underlying (options only).
    pub underlying_price: Option<Decimal>,
    /// Greeks and implied volatility, populated only for priceable options
    /// with a known underlying price.
    pub greeks: Option<BlackScholesGreeks>,
}

impl Quote {
    /// Builds a quote, deriving option Greeks when possible. `risk_free_rate`
    /// and `implied_volatility` are only consulted for option assets; pass
    /// `implied_volatility = None` to have it solved isn't supported — this
    /// engine takes IV as an input to the evaluator, matching the Black-Scholes
    /// evaluator's own parameterisation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        asset: Asset,
        quote_date: NaiveDateTime,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
        last: Option<Decimal>,
        bid_size: Option<u64>,
        ask_size: Option<u64>,
        volume: Option<u64>,
        underlying_price: Option<Decimal>,
        risk_free_rate: Decimal,
        implied_volatility: Option<Decimal>,
    ) -> Self {
        let mut quote = Quote {
            asset,
            quote_date,
            bid,
            ask,
            last,
            bid_size,
            ask_size,
            volume,
            underlying_price,
            greeks: None,
        };
        quote.greeks = quote.derive_greeks(risk_free_rate, implied_volatility);
        quote
    }

    /// `(bid + ask) / 2` when both are present and finite.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if bid >= Decimal::ZERO && ask >= bid => {
                Some((bid + ask) / dec!(2))
            }
            _ => None,
        }
    }

    /// Price is `last` when known, else `mid`, else `None`.
    pub fn price(&self) -> Option<Decimal> {
        self.last.or_else(|| self.mid())
    }

    /// A quote is priceable iff it has a usable non-zero mid or last.
    pub fn is_priceable(&self) -> bool {
        self.price().is_some_and(|p| p > Decimal::ZERO)
    }

    /// True when Greeks were successfully derived.
    pub fn has_greeks(&self) -> bool {
        self.greeks.is_some()
    }

    /// `max(0, underlying - strike)` / `max(0, strike - underlying)`, options only.
    pub fn intrinsic_value(&self) -> Option<Decimal> {
        match &self.asset {
            Asset::Option(opt) => {
                let underlying = self.underlying_price?;
                Some(intrinsic_value(opt.option_style, opt.strike, underlying))
            }
            Asset::Stock { .. } => None,
        }
    }

    /// `option_price - intrinsic_value`, floored at zero, options only.
    pub fn extrinsic_value(&self) -> Option<Decimal> {
        match &self.asset {
            Asset::Option(opt) => {
                let underlying = self.underlying_price?;
                let price = self.price()?;
                Some(extrinsic_value(opt.option_style, opt.strike, underlying, price))
            }
            Asset::Stock { .. } => None,
        }
    }

    fn derive_greeks(
        &self,
        risk_free_rate: Decimal,
        implied_volatility: Option<Decimal>,
    ) -> Option<BlackScholesGreeks> {
        let Asset::Option(opt) = &self.asset else {
            return None;
        };
        if !self.is_priceable() {
            return None;
        }
        let underlying = self.underlying_price?;
        let iv = implied_volatility?;
        let price = self.price()?;
        let as_of: NaiveDate = self.quote_date.date();
        let dte = days_to_expiration(opt.expiration, as_of);
        if dte <= 0 {
            return None;
        }
        black_scholes_greeks(
            opt.option_style,
            opt.strike,
            underlying,
            dte,
            price,
            risk_free_rate,
            iv,
            Decimal::ZERO,
        )
    }
}
