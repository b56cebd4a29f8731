/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Order and account validation: the structural checks every order must pass
//! before pricing, and the contextual checks run against live account state.

use crate::model::asset::{Asset, days_to_expiration};
use crate::model::order::{MultiLegOrder, OrderType};
use crate::model::position::Position;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Failures raised by [`AccountValidator`]/[`OrderValidator`]. Nothing mutates
/// on failure — validation is purely a read of the proposed state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A static/structural order fault: empty leg list, duplicate asset,
    /// zero quantity, a direction/price sign mismatch, or an expired/invalid option.
    #[error("{message}")]
    StructuralFault {
        /// The offending leg, if the fault is leg-scoped.
        leg_index: Option<usize>,
        /// Human-readable explanation.
        message: String,
    },
    /// A closing leg could not find sufficient opposite-sign quantity.
    #[error("insufficient position in {symbol}: requested {requested}, available {available}")]
    InsufficientPosition {
        /// The closing leg's index.
        leg_index: usize,
        /// Asset symbol being closed.
        symbol: String,
        /// Quantity the leg tried to close.
        requested: i64,
        /// Quantity actually available to close.
        available: i64,
    },
    /// Post-trade cash would go negative.
    #[error("insufficient cash: required {required}, available {available}")]
    InsufficientCash {
        /// Cash the order would require.
        required: Decimal,
        /// Cash on hand before the order.
        available: Decimal,
    },
    /// An optional policy threshold (position size, exposure, daily loss, delta) was exceeded.
    #[error("policy limit exceeded: {message}")]
    PolicyLimitExceeded {
        /// Which limit and by how much.
        message: String,
    },
}

impl ValidationError {
    /// The leg this error is scoped to, if any.
    pub fn leg_index(&self) -> Option<usize> {
        match self {
            ValidationError::StructuralFault { leg_index, .. } => *leg_index,
            ValidationError::InsufficientPosition { leg_index, .. } => Some(*leg_index),
            ValidationError::InsufficientCash { .. } | ValidationError::PolicyLimitExceeded { .. } => None,
        }
    }
}

fn structural(leg_index: Option<usize>, message: impl Into<String>) -> ValidationError {
    ValidationError::StructuralFault {
        leg_index,
        message: message.into(),
    }
}

/// Optional policy thresholds enforced only when the caller supplies them.
#[derive(Debug, Clone, Default)]
pub struct PolicyLimits {
    /// Maximum absolute notional for any single position.
    pub max_position_notional: Option<Decimal>,
    /// Maximum absolute total gross exposure across all positions.
    pub max_total_gross_exposure: Option<Decimal>,
    /// Maximum allowed realised loss in a single day.
    pub max_daily_realised_loss: Option<Decimal>,
    /// Maximum absolute portfolio delta.
    pub max_absolute_portfolio_delta: Option<Decimal>,
}

/// Static (structural) order validation: checks that depend only on the
/// order itself, not on account state.
pub struct OrderValidator;

impl OrderValidator {
    /// Runs every structural check, returning the first failure encountered.
    pub fn validate_structural(order: &MultiLegOrder, as_of: NaiveDate) -> Result<(), ValidationError> {
        if order.legs.is_empty() {
            return Err(structural(None, "order must have at least one leg"));
        }

        let mut seen_symbols: HashMap<&str, usize> = HashMap::new();
        for (index, leg) in order.legs.iter().enumerate() {
            let symbol = leg.asset.symbol();
            if let Some(first_index) = seen_symbols.insert(symbol, index) {
                return Err(structural(
                    Some(index),
                    format!("duplicate asset {symbol} also appears at leg {first_index}"),
                ));
            }

            if leg.quantity == 0 {
                return Err(structural(Some(index), "quantity cannot be zero"));
            }

            let is_buy_side = leg.order_type.is_buy_side();
            if is_buy_side && leg.quantity < 0 {
                return Err(structural(
                    Some(index),
                    format!("{} requires positive quantity", leg.order_type),
                ));
            }
            if !is_buy_side && leg.quantity > 0 {
                return Err(structural(
                    Some(index),
                    format!("{} requires negative quantity", leg.order_type),
                ));
            }
            if let Some(price) = leg.limit_price {
                if is_buy_side && price < Decimal::ZERO {
                    return Err(structural(Some(index), format!("{} requires a positive price", leg.order_type)));
                }
                if !is_buy_side && price > Decimal::ZERO {
                    return Err(structural(Some(index), format!("{} requires a negative price", leg.order_type)));
                }
            }

            if let Asset::Option(opt) = &leg.asset {
                if days_to_expiration(opt.expiration, as_of) < 0 {
                    return Err(structural(
                        Some(index),
                        format!("option {symbol} expired on {}", opt.expiration),
                    ));
                }
                if opt.strike.to_dec() <= Decimal::ZERO {
                    return Err(structural(Some(index), format!("invalid strike for {symbol}")));
                }
            }
        }

        Ok(())
    }
}

/// Contextual (runtime) account-state validation.
pub struct AccountValidator;

impl AccountValidator {
    /// Confirms every closing leg has sufficient opposite-sign quantity
    /// available to close, against a snapshot of current positions.
    pub fn validate_closing_positions(
        order: &MultiLegOrder,
        positions: &HashMap<String, &Position>,
    ) -> Result<(), ValidationError> {
        for (index, leg) in order.legs.iter().enumerate() {
            if !leg.order_type.is_closing() {
                continue;
            }
            let symbol = leg.asset.symbol();
            let available = positions
                .get(symbol)
                .filter(|pos| Self::is_closable(pos.quantity, leg.quantity))
                .map(|pos| pos.quantity.unsigned_abs() as i64)
                .unwrap_or(0);
            let requested = leg.quantity.unsigned_abs() as i64;
            if available < requested {
                return Err(ValidationError::InsufficientPosition {
                    leg_index: index,
                    symbol: symbol.to_string(),
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }

    fn is_closable(position_quantity: i64, leg_quantity: i64) -> bool {
        position_quantity.signum() == -leg_quantity.signum()
    }

    /// `cash + cash_delta ≥ 0`, checked independently of margin coverage.
    pub fn validate_cash(cash: Decimal, cash_delta: Decimal) -> Result<(), ValidationError> {
        let projected = cash + cash_delta;
        if projected < Decimal::ZERO {
            return Err(ValidationError::InsufficientCash {
                required: -cash_delta,
                available: cash,
            });
        }
        Ok(())
    }

    /// Enforces any policy thresholds the caller supplied; skips a check
    /// entirely when its threshold is `None`.
    pub fn validate_policy_limits(
        positions: &[&Position],
        limits: &PolicyLimits,
    ) -> Result<(), ValidationError> {
        if let Some(max_position) = limits.max_position_notional {
            for position in positions {
                let value = position
                    .current_price
                    .map(|price| (price * Decimal::from(position.quantity) * position.multiplier()).abs())
                    .unwrap_or(Decimal::ZERO);
                if value > max_position {
                    return Err(ValidationError::PolicyLimitExceeded {
                        message: format!(
                            "position {} notional {value} exceeds limit {max_position}",
                            position.asset.symbol()
                        ),
                    });
                }
            }
        }

        if let Some(max_exposure) = limits.max_total_gross_exposure {
            let total: Decimal = positions
                .iter()
                .filter_map(|p| {
                    p.current_price
                        .map(|price| (price * Decimal::from(p.quantity) * p.multiplier()).abs())
                })
                .sum();
            if total > max_exposure {
                return Err(ValidationError::PolicyLimitExceeded {
                    message: format!("total exposure {total} exceeds limit {max_exposure}"),
                });
            }
        }

        if let Some(max_loss) = limits.max_daily_realised_loss {
            let daily_pnl: Decimal = positions.iter().map(|p| p.realised_pnl).sum();
            if daily_pnl < -max_loss {
                return Err(ValidationError::PolicyLimitExceeded {
                    message: format!("daily realised loss {daily_pnl} exceeds limit {max_loss}"),
                });
            }
        }

        if let Some(max_delta) = limits.max_absolute_portfolio_delta {
            let portfolio_delta: Decimal = positions
                .iter()
                .filter_map(|p| p.greeks.as_ref().map(|g| g.delta * Decimal::from(p.quantity)))
                .sum();
            if portfolio_delta.abs() > max_delta {
                return Err(ValidationError::PolicyLimitExceeded {
                    message: format!("portfolio delta {portfolio_delta} exceeds limit {max_delta}"),
                });
            }
        }

        Ok(())
    }
}
