/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Position model: a single symbol's open quantity, cost basis, and realised
//! P&L. FIFO tax-lot ordering is approximated by stamping each position with
//! the timestamp of its most recent opening trade, per the engine's explicit
//! FIFO-by-creation-timestamp mandate.

use crate::greeks::black_scholes::BlackScholesGreeks;
use crate::model::asset::Asset;
use chrono::{DateTime, Utc};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An open position in one asset.
#[derive(DebugPretty, DisplaySimple, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    /// The held asset.
    pub asset: Asset,
    /// Signed quantity; a position with quantity 0 is considered closed and
    /// must be removed from the account rather than retained.
    pub quantity: i64,
    /// Average entry price, always non-negative.
    pub avg_price: Decimal,
    /// Accumulated realised P&L from partial or full closes.
    pub realised_pnl: Decimal,
    /// Most recent cached market price, if known.
    pub current_price: Option<Decimal>,
    /// Cached Greeks, options only.
    pub greeks: Option<BlackScholesGreeks>,
    /// Timestamp this position (or its most recent contributing open) was created.
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Opens a brand-new position from a single fill.
    pub fn open(asset: Asset, quantity: i64, fill_price: Decimal, opened_at: DateTime<Utc>) -> Self {
        Position {
            asset,
            quantity,
            avg_price: fill_price.abs(),
            realised_pnl: Decimal::ZERO,
            current_price: None,
            greeks: None,
            opened_at,
        }
    }

    /// Multiplier is 100 for options, 1 for stock.
    pub fn multiplier(&self) -> Decimal {
        self.asset.multiplier()
    }

    /// `Long` if quantity > 0, `Short` if quantity < 0. Undefined (returns `None`) at zero.
    pub fn is_long(&self) -> Option<bool> {
        if self.quantity == 0 {
            None
        } else {
            Some(self.quantity > 0)
        }
    }

    /// `(current − avg) × quantity × multiplier`; the sign of `quantity` already
    /// flips the result for shorts.
    pub fn unrealised_pnl(&self) -> Option<Decimal> {
        let current = self.current_price?;
        Some((current - self.avg_price) * Decimal::from(self.quantity) * self.multiplier())
    }

    /// Merges an additional same-sign fill via weighted average:
    /// `new_avg = (old_qty·old_avg + leg_qty·|leg_price|) / (old_qty + leg_qty)`.
    ///
    /// `opened_at` is refreshed to the new fill's timestamp, matching the
    /// engine's requirement to stamp positions at open (here: at the latest open).
    pub fn merge_opening(&mut self, leg_quantity: i64, fill_price: Decimal, opened_at: DateTime<Utc>) {
        let old_qty = Decimal::from(self.quantity);
        let new_qty = Decimal::from(leg_quantity);
        let total_qty = old_qty + new_qty;
        self.avg_price = (old_qty * self.avg_price + new_qty * fill_price.abs()) / total_qty;
        self.quantity += leg_quantity;
        self.opened_at = opened_at;
    }

    /// Closes `closed_qty` (always positive) units at `fill_price`, moving
    /// quantity toward zero and accumulating realised P&L, sign-flipped if
    /// this position was short.
    pub fn close_partial(&mut self, closed_qty: i64, fill_price: Decimal) -> Decimal {
        debug_assert!(closed_qty > 0);
        let was_long = self.quantity > 0;
        let pnl = (fill_price.abs() - self.avg_price) * Decimal::from(closed_qty) * self.multiplier();
        let pnl = if was_long { pnl } else { -pnl };
        self.realised_pnl += pnl;
        if was_long {
            self.quantity -= closed_qty;
        } else {
            self.quantity += closed_qty;
        }
        pnl
    }

    /// True once `quantity` has reached zero and the position should be dropped.
    pub fn is_closed(&self) -> bool {
        self.quantity == 0
    }
}

#[cfg(test)]
mod tests_position {
    use super::*;
    use crate::model::asset::asset_for;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 11, 9, 30, 0).unwrap()
    }

    #[test]
    fn open_sets_avg_price_to_abs_fill() {
        let pos = Position::open(asset_for("AAPL").unwrap(), 100, dec!(150.0), ts());
        assert_eq!(pos.avg_price, dec!(150.0));
        assert_eq!(pos.quantity, 100);
    }

    #[test]
    fn merge_opening_computes_weighted_average() {
        let mut pos = Position::open(asset_for("AAPL").unwrap(), 100, dec!(150.0), ts());
        pos.merge_opening(100, dec!(160.0), ts());
        assert_eq!(pos.quantity, 200);
        assert_eq!(pos.avg_price, dec!(155.0));
    }

    #[test]
    fn close_partial_accumulates_realised_pnl_for_long() {
        let mut pos = Position::open(asset_for("AAPL").unwrap(), 100, dec!(150.0), ts());
        let pnl = pos.close_partial(100, dec!(160.0));
        assert_eq!(pnl, dec!(1000.0));
        assert_eq!(pos.quantity, 0);
        assert!(pos.is_closed());
    }

    #[test]
    fn close_partial_sign_flips_for_short() {
        let mut pos = Position::open(asset_for("AAPL").unwrap(), -100, dec!(150.0), ts());
        let pnl = pos.close_partial(50, dec!(140.0));
        assert_eq!(pnl, dec!(500.0));
        assert_eq!(pos.quantity, -50);
    }

    #[test]
    fn unrealised_pnl_uses_cached_current_price() {
        let mut pos = Position::open(asset_for("AAPL").unwrap(), 100, dec!(150.0), ts());
        pos.current_price = Some(dec!(160.0));
        assert_eq!(pos.unrealised_pnl(), Some(dec!(1000.0)));
    }
}
