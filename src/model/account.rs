/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 11/8/24
******************************************************************************/

//! Account model: cash balance and an ordered set of positions keyed by
//! symbol, at most one position per symbol.

use crate::model::position::Position;
use chrono::{DateTime, Utc};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A paper-trading account: cash, positions, and a cached margin requirement.
#[derive(DebugPretty, DisplaySimple, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Unique account identifier.
    pub id: String,
    /// Owning user or entity.
    pub owner: String,
    /// Starting cash balance, immutable after creation.
    pub starting_balance: Decimal,
    /// Current cash balance.
    pub cash_balance: Decimal,
    /// Positions keyed by canonical asset symbol.
    pub positions: BTreeMap<String, Position>,
    /// Cached maintenance-margin requirement, recomputed after every mutation.
    pub maintenance_margin: Decimal,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent successful mutation.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account with the given starting cash and no positions.
    pub fn new(id: impl Into<String>, owner: impl Into<String>, starting_balance: Decimal, now: DateTime<Utc>) -> Self {
        Account {
            id: id.into(),
            owner: owner.into(),
            starting_balance,
            cash_balance: starting_balance,
            positions: BTreeMap::new(),
            maintenance_margin: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// The account's positions as a plain list, for callers that don't need symbol lookup.
    pub fn positions_vec(&self) -> Vec<&Position> {
        self.positions.values().collect()
    }

    /// Total portfolio value: cash plus the market value of every position
    /// with a cached current price (positions with no cached price contribute 0).
    pub fn portfolio_value(&self) -> Decimal {
        let positions_value: Decimal = self
            .positions
            .values()
            .filter_map(|p| {
                p.current_price
                    .map(|price| price * Decimal::from(p.quantity) * p.multiplier())
            })
            .sum();
        self.cash_balance + positions_value
    }

    /// `cash_balance ≥ −maintenance_margin_allowance` invariant check.
    pub fn is_cash_consistent(&self) -> bool {
        self.cash_balance + self.maintenance_margin >= Decimal::ZERO
    }

    /// `true` iff every held position has a non-zero quantity and the map has
    /// no stale zero-quantity entries (the universal per-commit invariant).
    pub fn positions_are_well_formed(&self) -> bool {
        self.positions.values().all(|p| p.quantity != 0)
    }

    /// Inserts or replaces a position, keyed by its asset's canonical symbol.
    /// Removes the entry instead when the incoming position is closed.
    pub fn upsert_position(&mut self, position: Position) {
        let symbol = position.asset.symbol().to_string();
        if position.is_closed() {
            self.positions.remove(&symbol);
        } else {
            self.positions.insert(symbol, position);
        }
    }
}
