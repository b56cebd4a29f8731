/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Asset model: a closed tagged variant over stocks and options, with the
//! OCC-style fixed-width symbol encoding as the single source of truth for
//! strike and expiration.

use crate::constants::{OPTION_MULTIPLIER, STOCK_MULTIPLIER};
use crate::model::positive::Positive;
use crate::model::types::OptionStyle;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A parsed option symbol: `SSSSSSYYMMDD[C|P]NNNNNNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OptionAsset {
    /// Canonical OCC symbol, upper-cased.
    pub symbol: String,
    /// Underlying stock symbol.
    pub underlying: String,
    /// Call or put.
    pub option_style: OptionStyle,
    /// Strike price, always positive.
    pub strike: Positive,
    /// Expiration date (calendar date, no time component).
    pub expiration: NaiveDate,
}

/// A tagged variant over the two asset kinds the engine trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Asset {
    /// A plain equity, identified by its ticker.
    Stock {
        /// 1-6 upper-case ASCII letters.
        symbol: String,
    },
    /// A standard equity option contract.
    Option(OptionAsset),
}

impl Asset {
    /// Canonical (always upper-case) symbol for this asset.
    pub fn symbol(&self) -> &str {
        match self {
            Asset::Stock { symbol } => symbol,
            Asset::Option(opt) => &opt.symbol,
        }
    }

    /// Shares represented by one unit of this asset: 100 for options, 1 for stock.
    pub fn multiplier(&self) -> Decimal {
        match self {
            Asset::Stock { .. } => Decimal::from(STOCK_MULTIPLIER),
            Asset::Option(_) => Decimal::from(OPTION_MULTIPLIER),
        }
    }

    /// True if this asset is an option.
    pub fn is_option(&self) -> bool {
        matches!(self, Asset::Option(_))
    }
}

impl std::hash::Hash for Asset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.symbol().hash(state);
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Days until `expiration`, as of `as_of`. Negative once expired.
pub fn days_to_expiration(expiration: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiration - as_of).num_days()
}

/// `max(0, underlying - strike)` for calls, `max(0, strike - underlying)` for puts.
pub fn intrinsic_value(style: OptionStyle, strike: Positive, underlying_price: Decimal) -> Decimal {
    match style {
        OptionStyle::Call => (underlying_price - strike.to_dec()).max(Decimal::ZERO),
        OptionStyle::Put => (strike.to_dec() - underlying_price).max(Decimal::ZERO),
    }
}

/// `option_price - intrinsic_value`, floored at zero.
pub fn extrinsic_value(
    style: OptionStyle,
    strike: Positive,
    underlying_price: Decimal,
    option_price: Decimal,
) -> Decimal {
    (option_price - intrinsic_value(style, strike, underlying_price)).max(Decimal::ZERO)
}

fn is_valid_stock_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= 6
        && symbol.chars().all(|c| c.is_ascii_uppercase())
}

/// `^[A-Z]{1,6}[0-9]{6}[CP][0-9]{8}$`. Parses strictly by fixed-width position.
fn parse_option_symbol(symbol: &str) -> Option<OptionAsset> {
    let bytes = symbol.as_bytes();
    if symbol.len() < 16 {
        return None;
    }
    // Find the [C|P] tag: it is the character right after a 6-digit date block,
    // and is followed by exactly 8 digits to the end of the string.
    let tag_idx = symbol.len() - 9;
    let tag = bytes[tag_idx] as char;
    if tag != 'C' && tag != 'P' {
        return None;
    }
    let underlying = &symbol[..tag_idx - 6];
    if !is_valid_stock_symbol(underlying) {
        return None;
    }
    let date_str = &symbol[tag_idx - 6..tag_idx];
    if date_str.len() != 6 || !date_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let strike_str = &symbol[tag_idx + 1..];
    if strike_str.len() != 8 || !strike_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let yy: i32 = date_str[0..2].parse().ok()?;
    let mm: u32 = date_str[2..4].parse().ok()?;
    let dd: u32 = date_str[4..6].parse().ok()?;
    let expiration = NaiveDate::from_ymd_opt(2000 + yy, mm, dd)?;

    let strike_thousandths: i64 = strike_str.parse().ok()?;
    let strike = Positive::new(Decimal::from(strike_thousandths) / dec!(1000)).ok()?;

    let option_style = if tag == 'C' {
        OptionStyle::Call
    } else {
        OptionStyle::Put
    };

    Some(OptionAsset {
        symbol: symbol.to_string(),
        underlying: underlying.to_string(),
        option_style,
        strike,
        expiration,
    })
}

/// Maps any string to the correct `Asset` variant, or `None` for "not a valid symbol".
///
/// Symbols are case-normalised to upper case before classification.
pub fn asset_for(symbol: &str) -> Option<Asset> {
    let upper = symbol.to_ascii_uppercase();
    if let Some(option) = parse_option_symbol(&upper) {
        return Some(Asset::Option(option));
    }
    if is_valid_stock_symbol(&upper) {
        return Some(Asset::Stock { symbol: upper });
    }
    None
}

/// Formats an `OptionAsset` back into its canonical OCC symbol.
pub fn format_option_symbol(
    underlying: &str,
    expiration: NaiveDate,
    style: OptionStyle,
    strike: Positive,
) -> String {
    let yy = expiration.year() % 100;
    let strike_thousandths = (strike.to_dec() * dec!(1000)).round();
    format!(
        "{}{:02}{:02}{:02}{}{:08}",
        underlying.to_ascii_uppercase(),
        yy,
        expiration.month(),
        expiration.day(),
        style,
        strike_thousandths
    )
}
