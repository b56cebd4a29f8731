/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Maintenance margin: a per-strategy formula table, summed whole-account.
//!
//! Every formula is a pure function of the recognised [`Strategy`] list, the
//! committed positions they were derived from, and a quote source consulted
//! for the underlying spot price and an option's current market value when a
//! formula needs live data (naked shorts, straddles, strangles). Nothing here
//! mutates the account; margin is recomputed after every successful mutation
//! and cached by the caller until the next one.

use crate::execution::QuoteSource;
use crate::model::asset::{Asset, OptionAsset};
use crate::model::position::Position;
use crate::model::strategy::Strategy;
use crate::model::types::OptionStyle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Sums the maintenance margin for every recognised strategy.
pub fn calculate_margin(
    strategies: &[Strategy],
    positions: &BTreeMap<String, Position>,
    quotes: &dyn QuoteSource,
) -> Decimal {
    strategies
        .iter()
        .map(|strategy| strategy_margin(strategy, positions, quotes))
        .sum()
}

fn strategy_margin(strategy: &Strategy, positions: &BTreeMap<String, Position>, quotes: &dyn QuoteSource) -> Decimal {
    match strategy {
        Strategy::LongStock { .. } | Strategy::LongCall { .. } | Strategy::LongPut { .. } => Decimal::ZERO,

        Strategy::ShortStock { symbol } => short_stock_margin(symbol, positions, quotes),

        Strategy::CoveredCall { .. } | Strategy::CoveredPut { .. } | Strategy::Protective { .. } => Decimal::ZERO,

        Strategy::VerticalCallSpread { long_symbol, short_symbol, params }
        | Strategy::VerticalPutSpread { long_symbol, short_symbol, params } => {
            let n = contracts(long_symbol, positions);
            let net_credit = net_credit_received(long_symbol, short_symbol, positions) * n;
            let max_loss = params.width * dec!(100) * n - net_credit;
            max_loss.max(Decimal::ZERO)
        }

        Strategy::CalendarSpread { near_symbol, far_symbol } | Strategy::DiagonalSpread { near_symbol, far_symbol } => {
            long_leg_debit(near_symbol, far_symbol, positions)
        }

        Strategy::Straddle { call_symbol, put_symbol } | Strategy::Strangle { call_symbol, put_symbol } => {
            straddle_margin(call_symbol, put_symbol, positions, quotes)
        }

        Strategy::Butterfly { low_symbol, mid_symbol, high_symbol } => {
            butterfly_margin(low_symbol, mid_symbol, high_symbol, positions)
        }

        Strategy::IronCondor { long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol }
        | Strategy::IronButterfly { long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol } => {
            iron_wing_margin(long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol, positions)
        }

        Strategy::ShortCall { symbol } | Strategy::ShortPut { symbol } => naked_option_margin(symbol, positions, quotes),

        Strategy::Custom { symbol } => custom_margin(symbol, positions, quotes),
    }
}

fn position_of<'a>(positions: &'a BTreeMap<String, Position>, symbol: &str) -> Option<&'a Position> {
    positions.get(symbol)
}

fn option_asset_of<'a>(positions: &'a BTreeMap<String, Position>, symbol: &str) -> Option<&'a OptionAsset> {
    match &position_of(positions, symbol)?.asset {
        Asset::Option(opt) => Some(opt),
        Asset::Stock { .. } => None,
    }
}

fn contracts(symbol: &str, positions: &BTreeMap<String, Position>) -> Decimal {
    position_of(positions, symbol)
        .map(|p| Decimal::from(p.quantity.unsigned_abs()))
        .unwrap_or(Decimal::ZERO)
}

/// Current best-known price for `symbol`: a live quote when one is available,
/// else the position's cached current price, else its average entry price.
fn market_value(symbol: &str, positions: &BTreeMap<String, Position>, quotes: &dyn QuoteSource) -> Decimal {
    if let Some(price) = quotes.quote(symbol).and_then(|q| q.price()) {
        return price;
    }
    position_of(positions, symbol)
        .map(|p| p.current_price.unwrap_or(p.avg_price))
        .unwrap_or(Decimal::ZERO)
}

fn short_stock_margin(symbol: &str, positions: &BTreeMap<String, Position>, quotes: &dyn QuoteSource) -> Decimal {
    let Some(position) = position_of(positions, symbol) else {
        return Decimal::ZERO;
    };
    let qty_abs = Decimal::from(position.quantity.unsigned_abs());
    let spot = market_value(symbol, positions, quotes);
    let position_value = qty_abs * spot;
    (dec!(0.30) * position_value).max(dec!(5) * qty_abs)
}

/// `(short leg's avg price − long leg's avg price)`, per contract — positive
/// when the spread was opened for a net credit.
fn net_credit_received(long_symbol: &str, short_symbol: &str, positions: &BTreeMap<String, Position>) -> Decimal {
    let long_price = position_of(positions, long_symbol).map(|p| p.avg_price).unwrap_or(Decimal::ZERO);
    let short_price = position_of(positions, short_symbol).map(|p| p.avg_price).unwrap_or(Decimal::ZERO);
    (short_price - long_price) * dec!(100)
}

/// Cost of whichever leg carries a positive (long) quantity — the calendar's
/// maximum loss is its net debit paid.
fn long_leg_debit(near_symbol: &str, far_symbol: &str, positions: &BTreeMap<String, Position>) -> Decimal {
    for symbol in [near_symbol, far_symbol] {
        if let Some(position) = position_of(positions, symbol) {
            if position.quantity > 0 {
                return position.avg_price * dec!(100) * Decimal::from(position.quantity);
            }
        }
    }
    Decimal::ZERO
}

/// `max(20% · underlying + option_market_value − OTM_amount, 10% · strike + option_market_value)`
/// per 100-share contract, scaled by the number of contracts held.
fn naked_option_margin(symbol: &str, positions: &BTreeMap<String, Position>, quotes: &dyn QuoteSource) -> Decimal {
    let Some(opt) = option_asset_of(positions, symbol) else {
        return Decimal::ZERO;
    };
    let n = contracts(symbol, positions);
    let spot = market_value(&opt.underlying, positions, quotes);
    let option_value = market_value(symbol, positions, quotes);
    let strike = opt.strike.to_dec();
    let otm_amount = match opt.option_style {
        OptionStyle::Call => (strike - spot).max(Decimal::ZERO),
        OptionStyle::Put => (spot - strike).max(Decimal::ZERO),
    };
    let per_share = (dec!(0.20) * spot + option_value - otm_amount).max(dec!(0.10) * strike + option_value);
    (per_share * dec!(100) * n).max(Decimal::ZERO)
}

fn straddle_margin(
    call_symbol: &str,
    put_symbol: &str,
    positions: &BTreeMap<String, Position>,
    quotes: &dyn QuoteSource,
) -> Decimal {
    let is_short = position_of(positions, call_symbol).map(|p| p.quantity < 0).unwrap_or(false);
    if !is_short {
        return Decimal::ZERO;
    }
    let n = contracts(call_symbol, positions);
    let call_naked = naked_option_margin(call_symbol, positions, quotes);
    let put_naked = naked_option_margin(put_symbol, positions, quotes);
    let call_premium = market_value(call_symbol, positions, quotes) * dec!(100) * n;
    let put_premium = market_value(put_symbol, positions, quotes) * dec!(100) * n;
    if call_naked >= put_naked {
        call_naked + put_premium
    } else {
        put_naked + call_premium
    }
}

fn net_cash_flow(symbols: &[&str], positions: &BTreeMap<String, Position>) -> Decimal {
    symbols
        .iter()
        .filter_map(|symbol| position_of(positions, symbol))
        .map(|p| {
            let premium = p.avg_price * dec!(100) * Decimal::from(p.quantity.unsigned_abs());
            if p.quantity < 0 { premium } else { -premium }
        })
        .sum()
}

fn butterfly_margin(low_symbol: &str, mid_symbol: &str, high_symbol: &str, positions: &BTreeMap<String, Position>) -> Decimal {
    let Some(low_opt) = option_asset_of(positions, low_symbol) else {
        return Decimal::ZERO;
    };
    let Some(mid_opt) = option_asset_of(positions, mid_symbol) else {
        return Decimal::ZERO;
    };
    let width = mid_opt.strike.to_dec() - low_opt.strike.to_dec();
    let n = contracts(low_symbol, positions);
    let cash_flow = net_cash_flow(&[low_symbol, mid_symbol, high_symbol], positions);
    if cash_flow >= Decimal::ZERO {
        (width * dec!(100) * n - cash_flow).max(Decimal::ZERO)
    } else {
        -cash_flow
    }
}

fn iron_wing_margin(
    long_put_symbol: &str,
    short_put_symbol: &str,
    short_call_symbol: &str,
    long_call_symbol: &str,
    positions: &BTreeMap<String, Position>,
) -> Decimal {
    let (Some(long_put), Some(short_put), Some(short_call), Some(long_call)) = (
        option_asset_of(positions, long_put_symbol),
        option_asset_of(positions, short_put_symbol),
        option_asset_of(positions, short_call_symbol),
        option_asset_of(positions, long_call_symbol),
    ) else {
        return Decimal::ZERO;
    };
    let put_width = short_put.strike.to_dec() - long_put.strike.to_dec();
    let call_width = long_call.strike.to_dec() - short_call.strike.to_dec();
    let width = put_width.max(call_width);
    let n = contracts(long_put_symbol, positions);
    let cash_flow = net_cash_flow(
        &[long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol],
        positions,
    );
    (width * dec!(100) * n - cash_flow).max(Decimal::ZERO)
}

fn custom_margin(symbol: &str, positions: &BTreeMap<String, Position>, quotes: &dyn QuoteSource) -> Decimal {
    let Some(position) = position_of(positions, symbol) else {
        return Decimal::ZERO;
    };
    if position.quantity > 0 {
        return Decimal::ZERO;
    }
    match &position.asset {
        Asset::Stock { .. } => short_stock_margin(symbol, positions, quotes),
        Asset::Option(_) => naked_option_margin(symbol, positions, quotes),
    }
}
