/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Multi-leg order execution: price every leg, decide whether the order
//! fills, validate, apply the legs to the account, and commit atomically.
//!
//! Nothing in `current account state` is mutated until every check before
//! commit has passed — a failed `execute` leaves the caller's `Account`
//! untouched.

use crate::error::EngineError;
use crate::model::account::Account;
use crate::model::order::{MultiLegOrder, OrderCondition, OrderType};
use crate::model::position::Position;
use crate::model::quote::Quote;
use crate::pricing::Estimator;
use crate::validation::{AccountValidator, OrderValidator};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{error, warn};

/// The outcome of submitting an order, mirroring the engine's
/// fill/not-filled/failed result sum type.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The order filled; the account passed in was mutated in place.
    Filled {
        /// Net cash impact of the fill (negative = cash paid out).
        cash_delta: Decimal,
        /// Canonical symbols of legs that opened or added to a position.
        opened: Vec<String>,
        /// Canonical symbols of legs that closed or reduced a position.
        closed: Vec<String>,
    },
    /// The order's fill condition (a limit threshold) was not met; the
    /// account is untouched.
    NotFilled {
        /// Explanation of which threshold was missed.
        reason: String,
    },
}

/// A source of quotes the execution engine can price legs against.
pub trait QuoteSource: Send + Sync {
    /// Returns the current quote for `symbol`, or `None` if unavailable.
    fn quote(&self, symbol: &str) -> Option<Quote>;
}

/// Executes a single [`MultiLegOrder`] against `account`, mutating it only
/// on success. Implements the nine-step algorithm: structural validation,
/// per-leg pricing, fill decision, closing-position validation, cash-
/// requirement computation, leg application, and commit.
pub fn execute_order(
    account: &mut Account,
    order: &MultiLegOrder,
    estimator: &Estimator,
    quotes: &dyn QuoteSource,
    as_of: DateTime<Utc>,
) -> Result<ExecutionOutcome, EngineError> {
    OrderValidator::validate_structural(order, as_of.date_naive()).map_err(|err| {
        warn!(error = %err, "order failed structural validation");
        err
    })?;

    let mut leg_prices = Vec::with_capacity(order.legs.len());
    let mut order_price = Decimal::ZERO;
    for leg in &order.legs {
        // A leg's own limit price already carries the sign the validator
        // enforces (positive for buys, negative for sells); an estimator's
        // result is an unsigned magnitude that still needs that sign applied.
        let signed = match leg.limit_price {
            Some(limit) => limit,
            None => {
                let symbol = leg.asset.symbol();
                let quote = quotes
                    .quote(symbol)
                    .ok_or_else(|| EngineError::QuoteUnavailable {
                        symbol: symbol.to_string(),
                    })?;
                let estimated = estimator
                    .estimate(&quote, leg.quantity)
                    .map_err(|err| EngineError::QuoteUnavailable {
                        symbol: format!("{symbol}: {err}"),
                    })?;
                if leg.quantity.is_negative() {
                    -estimated
                } else {
                    estimated
                }
            }
        };
        order_price += signed * Decimal::from(leg.quantity.abs());
        leg_prices.push(signed);
    }

    if let Some(reason) = fill_rejection_reason(order, order_price) {
        return Ok(ExecutionOutcome::NotFilled { reason });
    }

    let positions_by_symbol: HashMap<String, &Position> = account
        .positions
        .iter()
        .map(|(symbol, position)| (symbol.clone(), position))
        .collect();
    AccountValidator::validate_closing_positions(order, &positions_by_symbol).map_err(|err| {
        warn!(error = %err, "order failed closing-position validation");
        err
    })?;

    let cash_delta = cash_requirement(order, &leg_prices);
    AccountValidator::validate_cash(account.cash_balance, cash_delta).map_err(|err| {
        warn!(error = %err, "order rejected for insufficient cash");
        err
    })?;

    let mut opened = Vec::new();
    let mut closed = Vec::new();
    for (leg, fill_price) in order.legs.iter().zip(leg_prices.iter()) {
        let symbol = leg.asset.symbol().to_string();
        match leg.order_type {
            OrderType::Buy | OrderType::Sell | OrderType::BuyToOpen | OrderType::SellToOpen => {
                apply_opening_leg(account, leg, *fill_price, as_of);
                opened.push(symbol);
            }
            OrderType::BuyToClose | OrderType::SellToClose => {
                apply_closing_leg(account, leg, *fill_price)?;
                closed.push(symbol);
            }
        }
    }

    account.cash_balance += cash_delta;
    account.positions.retain(|_, position| !position.is_closed());
    account.updated_at = as_of;

    if !account.is_cash_consistent() || !account.positions_are_well_formed() {
        error!(account_id = %account.id, "post-commit invariant violated");
        return Err(EngineError::internal(
            "post-commit invariant violated: cash or position bookkeeping is inconsistent",
        ));
    }

    Ok(ExecutionOutcome::Filled {
        cash_delta,
        opened,
        closed,
    })
}

fn fill_rejection_reason(order: &MultiLegOrder, order_price: Decimal) -> Option<String> {
    match order.condition {
        OrderCondition::Market | OrderCondition::Stop => None,
        OrderCondition::Limit => {
            let limit = order.net_limit_price?;
            let is_net_buy = order_price >= Decimal::ZERO;
            let filled = if is_net_buy {
                limit >= order_price
            } else {
                limit <= order_price
            };
            if filled {
                None
            } else {
                Some(format!(
                    "limit {limit} not met by estimated net price {order_price}"
                ))
            }
        }
    }
}

fn cash_requirement(order: &MultiLegOrder, leg_prices: &[Decimal]) -> Decimal {
    let mut total = Decimal::ZERO;
    for (leg, fill_price) in order.legs.iter().zip(leg_prices.iter()) {
        let multiplier = leg.asset.multiplier();
        let sign = Decimal::from(leg.quantity.signum());
        let impact = fill_price.abs() * Decimal::from(leg.quantity.abs()) * multiplier * sign;
        total -= impact;
    }
    total
}

fn apply_opening_leg(account: &mut Account, leg: &crate::model::order::Leg, fill_price: Decimal, opened_at: DateTime<Utc>) {
    let symbol = leg.asset.symbol().to_string();
    match account.positions.get_mut(&symbol) {
        Some(existing) => existing.merge_opening(leg.quantity, fill_price, opened_at),
        None => {
            let position = Position::open(leg.asset.clone(), leg.quantity, fill_price, opened_at);
            account.positions.insert(symbol, position);
        }
    }
}

fn apply_closing_leg(account: &mut Account, leg: &crate::model::order::Leg, fill_price: Decimal) -> Result<(), EngineError> {
    let symbol = leg.asset.symbol().to_string();
    let mut remaining = leg.quantity.abs();
    let position = account
        .positions
        .get_mut(&symbol)
        .ok_or_else(|| EngineError::InsufficientPosition {
            symbol: symbol.clone(),
            requested: remaining,
            available: 0,
        })?;

    let closable = position.quantity.abs().min(remaining);
    position.close_partial(closable, fill_price);
    remaining -= closable;

    if remaining != 0 {
        let available = leg.quantity.abs() - remaining;
        warn!(symbol, requested = leg.quantity.abs(), available, "closing leg left unsatisfied remainder");
        return Err(EngineError::InsufficientPosition {
            symbol,
            requested: leg.quantity.abs(),
            available,
        });
    }
    Ok(())
}
