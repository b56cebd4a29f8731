/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Option expiration settlement: worthless expiry, exercise, and assignment.
//!
//! Every expired option position is classified by its intrinsic value at
//! `processing_date` and settled against the account's cash and underlying
//! stock position. The combined cash impact of the whole batch is checked
//! against current cash before anything is mutated; a failure settling one
//! option (e.g. a missing underlying quote) is recorded and the rest
//! continue, while the account is only committed once, after every option
//! has been processed.

use crate::error::EngineError;
use crate::execution::QuoteSource;
use crate::model::account::Account;
use crate::model::asset::{Asset, asset_for, days_to_expiration, intrinsic_value};
use crate::model::position::Position;
use crate::model::types::OptionStyle;
use crate::validation::AccountValidator;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

/// One settled (or failed-to-settle) expired option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExpirationEvent {
    /// The option symbol that expired.
    pub symbol: String,
    /// How the option was settled.
    pub kind: ExpirationKind,
    /// Cash impact of this single event.
    pub cash_delta: Decimal,
}

/// The settlement classification for one expired option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ExpirationKind {
    /// Intrinsic value was zero; the position is removed with no cash change.
    ExpiredWorthless,
    /// A long call was in the money; the holder bought the underlying at strike.
    ExercisedLongCall,
    /// A long put was in the money; the holder sold the underlying at strike.
    ExercisedLongPut,
    /// A short call was in the money; the writer delivered the underlying at strike.
    AssignedShortCall,
    /// A short put was in the money; the writer received the underlying at strike.
    AssignedShortPut,
}

/// The outcome of processing every expired option position in one account.
///
/// Not `ToSchema`: `errors` pairs a symbol with the full `EngineError` as a
/// tuple, which utoipa cannot represent as an OpenAPI schema; a façade layer
/// exposing this over HTTP should map `errors` to a named struct first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirationResult {
    /// One entry per option successfully settled.
    pub events: Vec<ExpirationEvent>,
    /// Total cash impact across every settled option.
    pub total_cash_delta: Decimal,
    /// One entry per option that could not be settled (e.g. no underlying quote).
    pub errors: Vec<(String, EngineError)>,
}

/// A planned settlement for one expired option, computed without mutating
/// the account so the whole batch's cash impact can be checked up front.
struct Settlement {
    symbol: String,
    kind: ExpirationKind,
    cash_delta: Decimal,
    quantity: i64,
    avg_price: Decimal,
    multiplier: Decimal,
    underlying_symbol: String,
    underlying_delta: i64,
    strike: Decimal,
}

/// Settles every option position in `account` whose expiration is on or
/// before `processing_date`. The net cash impact of every option that would
/// successfully settle is checked against current cash before anything is
/// mutated — if the batch would drive cash negative, the whole call fails
/// with `InsufficientCash` and the account is left untouched, mirroring the
/// same floor `execute_order` enforces. Options that fail to settle for
/// other reasons (e.g. missing underlying quote) are recorded in `errors`
/// and left in the account unsettled; every other option is still
/// processed and committed once at the end.
pub fn process_expirations(
    account: &mut Account,
    quotes: &dyn QuoteSource,
    processing_date: DateTime<Utc>,
) -> Result<ExpirationResult, EngineError> {
    let as_of = processing_date.date_naive();
    let expired_symbols: Vec<String> = account
        .positions
        .values()
        .filter_map(|position| match &position.asset {
            Asset::Option(opt) if days_to_expiration(opt.expiration, as_of) <= 0 => {
                Some(position.asset.symbol().to_string())
            }
            _ => None,
        })
        .collect();

    let mut settlements = Vec::new();
    let mut errors = Vec::new();
    for symbol in expired_symbols {
        match plan_settlement(account, quotes, &symbol) {
            Ok(settlement) => settlements.push(settlement),
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "option expiration settlement failed, leaving position unsettled");
                errors.push((symbol, err));
            }
        }
    }

    let total_cash_delta: Decimal = settlements.iter().map(|s| s.cash_delta).sum();
    AccountValidator::validate_cash(account.cash_balance, total_cash_delta).map_err(|err| {
        warn!(account_id = %account.id, error = %err, "expiration batch would overdraw cash, rolled back");
        err
    })?;

    let mut events = Vec::with_capacity(settlements.len());
    for settlement in &settlements {
        apply_settlement(account, settlement)?;
        events.push(ExpirationEvent {
            symbol: settlement.symbol.clone(),
            kind: settlement.kind,
            cash_delta: settlement.cash_delta,
        });
    }

    account.cash_balance += total_cash_delta;
    account.positions.retain(|_, position| !position.is_closed());
    account.updated_at = processing_date;

    Ok(ExpirationResult {
        events,
        total_cash_delta,
        errors,
    })
}

fn plan_settlement(account: &Account, quotes: &dyn QuoteSource, symbol: &str) -> Result<Settlement, EngineError> {
    let position = account
        .positions
        .get(symbol)
        .ok_or_else(|| EngineError::internal(format!("expired option {symbol} vanished mid-batch")))?;
    let Asset::Option(opt) = position.asset.clone() else {
        return Err(EngineError::internal(format!("{symbol} is not an option")));
    };
    let quantity = position.quantity;
    let avg_price = position.avg_price;
    let multiplier = position.multiplier();

    let underlying_quote = quotes
        .quote(&opt.underlying)
        .ok_or_else(|| EngineError::QuoteUnavailable {
            symbol: opt.underlying.clone(),
        })?;
    let underlying_price = underlying_quote
        .last
        .ok_or_else(|| EngineError::QuoteUnavailable {
            symbol: opt.underlying.clone(),
        })?;

    let intrinsic = intrinsic_value(opt.option_style, opt.strike, underlying_price);
    let is_long = quantity > 0;

    if intrinsic.is_zero() {
        return Ok(Settlement {
            symbol: symbol.to_string(),
            kind: ExpirationKind::ExpiredWorthless,
            cash_delta: Decimal::ZERO,
            quantity,
            avg_price,
            multiplier,
            underlying_symbol: opt.underlying.clone(),
            underlying_delta: 0,
            strike: opt.strike.to_dec(),
        });
    }

    let kind = match (opt.option_style, is_long) {
        (OptionStyle::Call, true) => ExpirationKind::ExercisedLongCall,
        (OptionStyle::Put, true) => ExpirationKind::ExercisedLongPut,
        (OptionStyle::Call, false) => ExpirationKind::AssignedShortCall,
        (OptionStyle::Put, false) => ExpirationKind::AssignedShortPut,
    };

    let exercise_is_positive = (opt.option_style == OptionStyle::Call) == is_long;
    let contracts = Decimal::from(quantity.abs());
    let notional = opt.strike.to_dec() * multiplier * contracts;
    let shares = quantity.abs() * crate::constants::OPTION_MULTIPLIER;
    let (cash_delta, underlying_delta) = if exercise_is_positive {
        (-notional, shares)
    } else {
        (notional, -shares)
    };

    Ok(Settlement {
        symbol: symbol.to_string(),
        kind,
        cash_delta,
        quantity,
        avg_price,
        multiplier,
        underlying_symbol: opt.underlying.clone(),
        underlying_delta,
        strike: opt.strike.to_dec(),
    })
}

fn apply_settlement(account: &mut Account, settlement: &Settlement) -> Result<(), EngineError> {
    if settlement.kind == ExpirationKind::ExpiredWorthless {
        let position = account.positions.get_mut(&settlement.symbol).unwrap();
        position.realised_pnl += -settlement.avg_price * Decimal::from(settlement.quantity) * settlement.multiplier;
        position.quantity = 0;
        return Ok(());
    }

    let underlying_asset = asset_for(&settlement.underlying_symbol)
        .ok_or_else(|| EngineError::InvalidSymbol { symbol: settlement.underlying_symbol.clone() })?;
    apply_underlying_delta(
        account,
        &settlement.underlying_symbol,
        underlying_asset,
        settlement.underlying_delta,
        settlement.strike,
        account.updated_at,
    );

    let option_position = account.positions.get_mut(&settlement.symbol).unwrap();
    option_position.quantity = 0;
    Ok(())
}

/// Applies a `delta`-share settlement fill to the underlying position under
/// `symbol`. When an existing position opposes `delta` in sign, it is closed
/// FIFO (realised P&L booked against it, as the spec's exercise/assignment
/// settlement requires) before any leftover is opened on the new side;
/// same-sign or absent positions are simply merged/opened. This avoids
/// handing a sign-opposing delta to `merge_opening`, which assumes a same-
/// sign addition and divides by `old_qty + new_qty` — zero exactly when the
/// two offset each other, e.g. an exercised long put closing a matching long
/// stock lot.
fn apply_underlying_delta(
    account: &mut Account,
    symbol: &str,
    asset: Asset,
    delta: i64,
    price: Decimal,
    opened_at: DateTime<Utc>,
) {
    let existing_qty = account.positions.get(symbol).map(|p| p.quantity).unwrap_or(0);

    if existing_qty != 0 && existing_qty.signum() != delta.signum() {
        let closable = existing_qty.unsigned_abs().min(delta.unsigned_abs()) as i64;
        let position = account.positions.get_mut(symbol).unwrap();
        position.close_partial(closable, price);
        let fully_closed = position.is_closed();
        if fully_closed {
            account.positions.remove(symbol);
        }

        let remaining = delta.unsigned_abs() as i64 - closable;
        if remaining != 0 {
            let remaining_signed = remaining * delta.signum();
            match account.positions.get_mut(symbol) {
                Some(position) => position.merge_opening(remaining_signed, price, opened_at),
                None => {
                    account.positions.insert(symbol.to_string(), Position::open(asset, remaining_signed, price, opened_at));
                }
            }
        }
        return;
    }

    match account.positions.get_mut(symbol) {
        Some(position) => position.merge_opening(delta, price, opened_at),
        None => {
            account.positions.insert(symbol.to_string(), Position::open(asset, delta, price, opened_at));
        }
    }
}
