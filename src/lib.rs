#![allow(unknown_lints)]
#![allow(clippy::literal_string_with_formatting_args)]

//!
//! # paperbroker: A Paper-Trading Engine for US Equities and Options
//!
//! `paperbroker` simulates order execution, option expiration settlement,
//! strategy recognition, and maintenance margin for a single paper-trading
//! account, without touching any real venue or moving real money.
//!
//! ## Project Structure
//!
//! 1. **Model** (`model/`): the closed data model — `Asset` (stock/option
//!    tagged variant with OCC symbol parsing), `Quote` (bid/ask/last plus
//!    derived Greeks), `Leg`/`MultiLegOrder`, `Position`, `Account`, and the
//!    19-variant `Strategy` tag the recogniser produces.
//! 2. **Greeks** (`greeks/`): Black-Scholes Greeks, parameterized by style,
//!    strike, underlying price, days to expiration, and implied volatility.
//! 3. **Pricing** (`pricing/`): the nine fill-price [`Estimator`](pricing::Estimator)
//!    variants used to turn a quote and a signed quantity into a fill price.
//! 4. **Validation** (`validation/`): structural order checks that depend
//!    only on the order itself, and contextual checks run against live
//!    account state (closing-position sufficiency, cash, optional policy
//!    limits).
//! 5. **Execution** (`execution/`): the atomic multi-leg order execution
//!    algorithm — price, decide fill, validate, apply, commit.
//! 6. **Expiration** (`expiration/`): option expiration settlement —
//!    worthless expiry, exercise, and assignment.
//! 7. **Strategies** (`strategies/`): the greedy strategy recogniser that
//!    classifies a set of positions into one of the 19 [`Strategy`](model::Strategy)
//!    variants.
//! 8. **Margin** (`margin/`): the maintenance margin calculator, recomputed
//!    whole-account after every mutation.
//! 9. **Broker** (`broker/`): the façade orchestrating the above behind a
//!    single async surface, with a per-account lock serializing mutations.
//! 10. **Config** (`config/`): environment-driven tunables (log level,
//!     default estimator).
//! 11. **Utils** (`utils/`): ambient utilities, currently just logger setup.
//! 12. **Error** (`error/`): the closed `EngineError` taxonomy shared by
//!     every component.
//!
//! ## Usage Example
//!
//! ```rust
//! use paperbroker::model::asset::asset_for;
//! use paperbroker::model::order::{Leg, MultiLegOrder, OrderCondition, OrderType};
//! use paperbroker::utils::setup_logger;
//!
//! setup_logger();
//! let asset = asset_for("AAPL").expect("valid symbol");
//! let leg = Leg::market(asset, 100, OrderType::Buy);
//! let order = MultiLegOrder::single(leg, OrderCondition::Market, None);
//! assert_eq!(order.legs.len(), 1);
//! ```
//!
//! ## Contribution and Contact
//!
//! **Joaquín Béjar García**
//! - Email: jb@taunais.com
//! - GitHub: [joaquinbejar](https://github.com/joaquinbejar)

extern crate core;

/// Library-wide numeric and calendar constants.
pub mod constants;

/// Environment-driven tunables (log level, default estimator).
pub mod config;

/// The closed `EngineError` taxonomy shared by every component.
pub mod error;

/// Black-Scholes Greeks calculation.
pub mod greeks;

/// Core data structures: assets, quotes, orders, positions, accounts, strategies.
pub mod model;

/// Fill-price estimators.
pub mod pricing;

/// Order and account validation.
pub mod validation;

/// Atomic multi-leg order execution.
pub mod execution;

/// Option expiration settlement.
pub mod expiration;

/// The greedy strategy recogniser.
pub mod strategies;

/// The maintenance margin calculator.
pub mod margin;

/// The broker façade orchestrating the engine behind a single async surface.
#[cfg(feature = "async")]
pub mod broker;

/// General-purpose ambient utilities (logging).
pub mod utils;

pub use error::EngineError;
pub use model::{Account, Asset, Leg, MultiLegOrder, Position, Positive, Quote, Strategy};
