/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Order model: a single wire form shared by single-leg and multi-leg orders.

use crate::model::asset::Asset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tags both the direction and the open/close semantics of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderType {
    /// Plain buy (stock, or an option leg with no open/close distinction).
    Buy,
    /// Plain sell.
    Sell,
    /// Buy-to-open: establishes or adds to a long option position.
    BuyToOpen,
    /// Sell-to-open: establishes or adds to a short option position.
    SellToOpen,
    /// Buy-to-close: reduces or closes a short option position.
    BuyToClose,
    /// Sell-to-close: reduces or closes a long option position.
    SellToClose,
}

impl OrderType {
    /// True for BUY/BTO/BTC — order types whose quantity and, if priced, price must be positive.
    pub fn is_buy_side(self) -> bool {
        matches!(
            self,
            OrderType::Buy | OrderType::BuyToOpen | OrderType::BuyToClose
        )
    }

    /// True for BTC/STC — order types that reduce an existing position rather than open one.
    pub fn is_closing(self) -> bool {
        matches!(self, OrderType::BuyToClose | OrderType::SellToClose)
    }

    /// True for BTO/STO — order types that only ever open or add to a position.
    pub fn is_opening_only(self) -> bool {
        matches!(self, OrderType::BuyToOpen | OrderType::SellToOpen)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            OrderType::Buy => "BUY",
            OrderType::Sell => "SELL",
            OrderType::BuyToOpen => "BTO",
            OrderType::SellToOpen => "STO",
            OrderType::BuyToClose => "BTC",
            OrderType::SellToClose => "STC",
        };
        write!(f, "{tag}")
    }
}

/// One component of an order: exactly one asset with a signed quantity.
///
/// Positive quantity = long/open-buy or close-short; negative = short/open-sell
/// or close-long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Leg {
    /// The asset this leg trades.
    pub asset: Asset,
    /// Signed quantity; never zero.
    pub quantity: i64,
    /// Direction and open/close tag.
    pub order_type: OrderType,
    /// Per-leg limit price, if the caller wants to cap this leg specifically.
    pub limit_price: Option<Decimal>,
    /// Per-leg stop price; treated as "market at the stated stop price" by the core.
    pub stop_price: Option<Decimal>,
}

impl Leg {
    /// Convenience constructor for a market leg with no limit or stop.
    pub fn market(asset: Asset, quantity: i64, order_type: OrderType) -> Self {
        Leg {
            asset,
            quantity,
            order_type,
            limit_price: None,
            stop_price: None,
        }
    }
}

/// The condition under which a [`MultiLegOrder`] may fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderCondition {
    /// Always fills at the estimated price.
    Market,
    /// Fills only if the net estimated price satisfies `net_limit_price`.
    Limit,
    /// Treated as market once the stop is touched; touch detection is external.
    Stop,
}

/// A non-empty list of legs executed as a single atomic transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MultiLegOrder {
    /// The legs, in submission order. All assets must be distinct.
    pub legs: Vec<Leg>,
    /// The fill condition.
    pub condition: OrderCondition,
    /// An optional net limit price across all legs (sign is the threshold direction).
    pub net_limit_price: Option<Decimal>,
}

impl MultiLegOrder {
    /// Builds a multi-leg order from a non-empty `Vec<Leg>`.
    pub fn new(legs: Vec<Leg>, condition: OrderCondition, net_limit_price: Option<Decimal>) -> Self {
        MultiLegOrder {
            legs,
            condition,
            net_limit_price,
        }
    }

    /// Wraps a single leg as a one-leg multi-leg order — the single-leg `Order` view.
    pub fn single(leg: Leg, condition: OrderCondition, limit_price: Option<Decimal>) -> Self {
        MultiLegOrder::new(vec![leg], condition, limit_price)
    }
}

#[cfg(test)]
mod tests_order {
    use super::*;
    use crate::model::asset::asset_for;

    #[test]
    fn order_type_classification() {
        assert!(OrderType::BuyToOpen.is_buy_side());
        assert!(!OrderType::SellToOpen.is_buy_side());
        assert!(OrderType::BuyToClose.is_closing());
        assert!(!OrderType::BuyToOpen.is_closing());
        assert!(OrderType::SellToOpen.is_opening_only());
    }

    #[test]
    fn single_leg_order_is_one_leg_multileg() {
        let leg = Leg::market(asset_for("AAPL").unwrap(), 100, OrderType::Buy);
        let order = MultiLegOrder::single(leg, OrderCondition::Market, None);
        assert_eq!(order.legs.len(), 1);
    }

    #[test]
    fn display_matches_occ_tags() {
        assert_eq!(OrderType::BuyToOpen.to_string(), "BTO");
        assert_eq!(OrderType::SellToClose.to_string(), "STC");
    }
}
