/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Strategy model: the tagged variant the recogniser produces from a set of
//! positions. Strategies hold references (by symbol) to their contributing
//! positions rather than copies, and are never persisted — they are
//! recomputed on demand from the committed account snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structural parameters shared by the spread-like strategy variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpreadParams {
    /// Strike of the long leg (or lower strike, for same-direction spreads).
    pub long_strike: Decimal,
    /// Strike of the short leg (or higher strike).
    pub short_strike: Decimal,
    /// `|short_strike - long_strike|`.
    pub width: Decimal,
}

/// A canonical option/stock strategy recognised from an account's positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum Strategy {
    /// Bare long stock position.
    LongStock { symbol: String },
    /// Bare short stock position.
    ShortStock { symbol: String },
    /// Bare long call.
    LongCall { symbol: String },
    /// Bare short call.
    ShortCall { symbol: String },
    /// Bare long put.
    LongPut { symbol: String },
    /// Bare short put.
    ShortPut { symbol: String },
    /// Long stock covered by a short call.
    CoveredCall { stock_symbol: String, call_symbol: String },
    /// Short stock covered by a short put.
    CoveredPut { stock_symbol: String, put_symbol: String },
    /// Long stock hedged by a long put, or short stock hedged by a long call.
    Protective { underlying_symbol: String, option_symbol: String },
    /// Same-type options, same expiration, different strikes.
    VerticalCallSpread { long_symbol: String, short_symbol: String, params: SpreadParams },
    /// Same-type options, same expiration, different strikes.
    VerticalPutSpread { long_symbol: String, short_symbol: String, params: SpreadParams },
    /// Same-type options, same strike, different expirations.
    CalendarSpread { near_symbol: String, far_symbol: String },
    /// Same-type options, different strikes and different expirations.
    DiagonalSpread { near_symbol: String, far_symbol: String },
    /// Long or short call + put, same strike, same expiration.
    Straddle { call_symbol: String, put_symbol: String },
    /// Long or short call + put, different strikes (call above put), same expiration.
    Strangle { call_symbol: String, put_symbol: String },
    /// Three strikes, `[+n, -2n, +n]` (or sign-flipped), all-call or all-put.
    Butterfly { low_symbol: String, mid_symbol: String, high_symbol: String },
    /// Four-leg, long low put / short higher put / short lower call / long highest call.
    IronCondor {
        long_put_symbol: String,
        short_put_symbol: String,
        short_call_symbol: String,
        long_call_symbol: String,
    },
    /// As iron condor but the two short strikes coincide.
    IronButterfly {
        long_put_symbol: String,
        short_put_symbol: String,
        short_call_symbol: String,
        long_call_symbol: String,
    },
    /// Anything left over after every other pattern has been tried; one per leftover position.
    Custom { symbol: String },
}

impl Strategy {
    /// The symbols of every position this strategy consumed, in a stable order.
    pub fn symbols(&self) -> Vec<&str> {
        match self {
            Strategy::LongStock { symbol }
            | Strategy::ShortStock { symbol }
            | Strategy::LongCall { symbol }
            | Strategy::ShortCall { symbol }
            | Strategy::LongPut { symbol }
            | Strategy::ShortPut { symbol }
            | Strategy::Custom { symbol } => vec![symbol],
            Strategy::CoveredCall { stock_symbol, call_symbol } => vec![stock_symbol, call_symbol],
            Strategy::CoveredPut { stock_symbol, put_symbol } => vec![stock_symbol, put_symbol],
            Strategy::Protective { underlying_symbol, option_symbol } => {
                vec![underlying_symbol, option_symbol]
            }
            Strategy::VerticalCallSpread { long_symbol, short_symbol, .. }
            | Strategy::VerticalPutSpread { long_symbol, short_symbol, .. } => {
                vec![long_symbol, short_symbol]
            }
            Strategy::CalendarSpread { near_symbol, far_symbol }
            | Strategy::DiagonalSpread { near_symbol, far_symbol } => vec![near_symbol, far_symbol],
            Strategy::Straddle { call_symbol, put_symbol }
            | Strategy::Strangle { call_symbol, put_symbol } => vec![call_symbol, put_symbol],
            Strategy::Butterfly { low_symbol, mid_symbol, high_symbol } => {
                vec![low_symbol, mid_symbol, high_symbol]
            }
            Strategy::IronCondor {
                long_put_symbol,
                short_put_symbol,
                short_call_symbol,
                long_call_symbol,
            } => vec![long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol],
            Strategy::IronButterfly {
                long_put_symbol,
                short_put_symbol,
                short_call_symbol,
                long_call_symbol,
            } => vec![long_put_symbol, short_put_symbol, short_call_symbol, long_call_symbol],
        }
    }

    /// A short, human-readable name for the strategy kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Strategy::LongStock { .. } => "LongStock",
            Strategy::ShortStock { .. } => "ShortStock",
            Strategy::LongCall { .. } => "LongCall",
            Strategy::ShortCall { .. } => "ShortCall",
            Strategy::LongPut { .. } => "LongPut",
            Strategy::ShortPut { .. } => "ShortPut",
            Strategy::CoveredCall { .. } => "CoveredCall",
            Strategy::CoveredPut { .. } => "CoveredPut",
            Strategy::Protective { .. } => "Protective",
            Strategy::VerticalCallSpread { .. } => "VerticalCallSpread",
            Strategy::VerticalPutSpread { .. } => "VerticalPutSpread",
            Strategy::CalendarSpread { .. } => "CalendarSpread",
            Strategy::DiagonalSpread { .. } => "DiagonalSpread",
            Strategy::Straddle { .. } => "Straddle",
            Strategy::Strangle { .. } => "Strangle",
            Strategy::Butterfly { .. } => "Butterfly",
            Strategy::IronCondor { .. } => "IronCondor",
            Strategy::IronButterfly { .. } => "IronButterfly",
            Strategy::Custom { .. } => "Custom",
        }
    }
}
