/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 20/12/24
******************************************************************************/

//! # Error Module
//!
//! A single closed error taxonomy for the trading engine. Every externally
//! visible failure carries a stable kind plus enough structured context to
//! act on it (which leg, which symbol, how much cash was missing).
//!
//! Component-local errors (`ValidationError`, `EstimatorError`) are their own
//! `thiserror` enums and convert into `EngineError` via `#[from]`, so callers
//! that only care about the top-level kind never need to match on them
//! directly.

use crate::validation::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// The closed set of externally visible failure kinds.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum EngineError {
    /// A symbol does not parse as a stock or option under the OCC encoding.
    #[error("invalid symbol: {symbol}")]
    InvalidSymbol {
        /// The offending symbol, as supplied by the caller.
        symbol: String,
    },

    /// The quote source could not supply a usable quote for `symbol`.
    #[error("quote unavailable for {symbol}")]
    QuoteUnavailable {
        /// The symbol the quote was requested for.
        symbol: String,
    },

    /// A structural or contextual validation rule rejected the order.
    #[error("validation failed at leg {leg_index:?}: {message}")]
    ValidationFailed {
        /// Index of the offending leg, if the failure is leg-scoped.
        leg_index: Option<usize>,
        /// Human-readable explanation.
        message: String,
    },

    /// Post-trade cash would be negative and no margin covers the shortfall.
    #[error("insufficient cash: required {required}, available {available}")]
    InsufficientCash {
        /// Cash the order would have required.
        required: Decimal,
        /// Cash actually available.
        available: Decimal,
    },

    /// A closing leg could not find enough opposite-sign quantity to close.
    #[error("insufficient position in {symbol}: requested {requested}, available {available}")]
    InsufficientPosition {
        /// Asset symbol being closed.
        symbol: String,
        /// Quantity the leg tried to close.
        requested: i64,
        /// Quantity actually available to close.
        available: i64,
    },

    /// A limit order's threshold was not met; not a fatal account error.
    #[error("order condition not met: {message}")]
    OrderConditionNotMet {
        /// Explanation of which threshold was missed.
        message: String,
    },

    /// The account store failed to persist a commit.
    #[error("persistence error: {message}")]
    PersistenceError {
        /// Store-provided explanation.
        message: String,
    },

    /// No account exists under the requested id.
    #[error("account not found: {id}")]
    AccountNotFound {
        /// The requested account id.
        id: String,
    },

    /// The caller cancelled an in-flight suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// An internal invariant was violated; a programming error, not a user error.
    #[error("internal error: {message}")]
    Internal {
        /// Explanation for logs/bug reports.
        message: String,
    },
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InsufficientCash { required, available } => {
                EngineError::InsufficientCash { required, available }
            }
            ValidationError::InsufficientPosition {
                symbol,
                requested,
                available,
                ..
            } => EngineError::InsufficientPosition {
                symbol,
                requested,
                available,
            },
            other => EngineError::ValidationFailed {
                leg_index: other.leg_index(),
                message: other.to_string(),
            },
        }
    }
}

impl EngineError {
    /// Constructs an [`EngineError::Internal`] from any displayable cause.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }
}
