/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Broker façade: the single async surface orchestrating account loading,
//! order execution, expiration settlement, strategy recognition, and margin
//! recalculation behind a per-account lock.
//!
//! Mutating calls (`submit_order`, `run_expirations`) serialise on the
//! target account so two concurrent orders on the same account never
//! interleave; reads (`positions`, `strategies`, `margin`, `portfolio_value`,
//! `account_summary`) take no lock and may observe a snapshot slightly
//! behind the latest commit.

use crate::error::EngineError;
use crate::execution::{self, ExecutionOutcome, QuoteSource};
use crate::expiration::{self, ExpirationResult};
use crate::margin::calculate_margin;
use crate::model::account::Account;
use crate::model::asset::{Asset, days_to_expiration};
use crate::model::order::MultiLegOrder;
use crate::model::position::Position;
use crate::model::strategy::Strategy;
use crate::pricing::Estimator;
use crate::strategies::recognise;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{error, warn};

/// Account persistence, consumed by the façade.
///
/// `save` must be atomic per account; the store is authoritative for
/// `starting_balance` and must reject attempts to change it after creation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Loads the account under `account_id`, or `None` if it does not exist.
    async fn load(&self, account_id: &str) -> Result<Option<Account>, EngineError>;
    /// Persists `account`, replacing whatever was stored under its id.
    async fn save(&self, account: &Account) -> Result<(), EngineError>;
    /// Every account id currently known to the store.
    async fn list_ids(&self) -> Result<Vec<String>, EngineError>;
}

/// A read-only convenience view combining cash, portfolio value, unrealised
/// P&L, cached margin, and recognised strategies — one round trip instead
/// of four.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    /// The account this summary describes.
    pub account_id: String,
    /// Current cash balance.
    pub cash_balance: Decimal,
    /// Cash plus the market value of every priced position.
    pub portfolio_value: Decimal,
    /// Sum of unrealised P&L across positions with a cached current price.
    pub unrealised_pnl: Decimal,
    /// Maintenance margin recomputed from the current positions and quotes.
    pub maintenance_margin: Decimal,
    /// Strategies recognised from the current positions.
    pub strategies: Vec<Strategy>,
}

/// An optional collaborator holding resting/pending orders outside the core
/// engine. The core itself is stateless with respect to order books: stop
/// orders convert to market "at touch" and limit orders that don't fill are
/// simply reported as [`ExecutionOutcome::NotFilled`]; a deployment that
/// wants real resting orders and periodic fill attempts plugs one in here.
#[async_trait]
pub trait OrderBook: Send + Sync {
    /// Parks `order` for later fill attempts against `account_id`, returning
    /// the id it was assigned for later cancellation.
    async fn rest(&self, account_id: &str, order: MultiLegOrder) -> Result<String, EngineError>;
    /// Cancels a previously rested order, if still pending.
    async fn cancel(&self, account_id: &str, order_id: &str) -> Result<(), EngineError>;
    /// Every order still resting for `account_id`.
    async fn pending(&self, account_id: &str) -> Result<Vec<MultiLegOrder>, EngineError>;
}

/// Orchestrates the core engine behind a single async surface.
///
/// Generic over nothing — collaborators are trait objects so one façade
/// type can be constructed against any store/quote-source pair without the
/// caller threading generic parameters through every call site.
pub struct Broker {
    store: Arc<dyn AccountStore>,
    quotes: Arc<dyn QuoteSource>,
    default_estimator: Estimator,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    order_book: Option<Arc<dyn OrderBook>>,
    auto_process_expirations: bool,
}

impl Broker {
    /// Builds a façade over the given collaborators and default estimator.
    /// Expiration pre-processing on `submit_order` is enabled by default;
    /// see [`Broker::with_order_book`] and [`Broker::with_expiration_policy`]
    /// to customise either.
    pub fn new(store: Arc<dyn AccountStore>, quotes: Arc<dyn QuoteSource>, default_estimator: Estimator) -> Self {
        Broker {
            store,
            quotes,
            default_estimator,
            locks: Mutex::new(HashMap::new()),
            order_book: None,
            auto_process_expirations: true,
        }
    }

    /// Attaches an [`OrderBook`] collaborator for resting/pending order
    /// state. Builder-style; returns `self` for chaining off [`Broker::new`].
    pub fn with_order_book(mut self, order_book: Arc<dyn OrderBook>) -> Self {
        self.order_book = Some(order_book);
        self
    }

    /// Toggles whether `submit_order` runs §4.F expiration settlement first
    /// when the account holds options expired as of the order's timestamp.
    /// Builder-style; returns `self` for chaining off [`Broker::new`].
    pub fn with_expiration_policy(mut self, auto_process_expirations: bool) -> Self {
        self.auto_process_expirations = auto_process_expirations;
        self
    }

    /// Every order still resting for `account_id`, delegated to the
    /// attached [`OrderBook`] collaborator if one is present, or an empty
    /// list otherwise — the core itself keeps no pending-order state.
    pub async fn pending_orders(&self, account_id: &str) -> Result<Vec<MultiLegOrder>, EngineError> {
        match &self.order_book {
            Some(book) => book.pending(account_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Parks `order` with the attached [`OrderBook`] collaborator instead of
    /// attempting to fill it immediately. Fails if no collaborator is attached.
    pub async fn rest_order(&self, account_id: &str, order: MultiLegOrder) -> Result<String, EngineError> {
        match &self.order_book {
            Some(book) => book.rest(account_id, order).await,
            None => Err(EngineError::internal("no OrderBook collaborator attached")),
        }
    }

    /// Cancels a previously rested order via the attached [`OrderBook`].
    pub async fn cancel_order(&self, account_id: &str, order_id: &str) -> Result<(), EngineError> {
        match &self.order_book {
            Some(book) => book.cancel(account_id, order_id).await,
            None => Err(EngineError::internal("no OrderBook collaborator attached")),
        }
    }

    fn lock_for(&self, account_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("account lock map poisoned");
        locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Creates and persists a new account with `starting_balance` cash and
    /// no positions.
    pub async fn create_account(
        &self,
        account_id: impl Into<String>,
        owner: impl Into<String>,
        starting_balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Account, EngineError> {
        let account = Account::new(account_id, owner, starting_balance, now);
        self.store.save(&account).await?;
        Ok(account)
    }

    /// Loads an account, failing with [`EngineError::AccountNotFound`] if it
    /// does not exist.
    pub async fn load_account(&self, account_id: &str) -> Result<Account, EngineError> {
        self.store.load(account_id).await?.ok_or_else(|| {
            let err = EngineError::AccountNotFound { id: account_id.to_string() };
            warn!(account_id, "account lookup failed");
            err
        })
    }

    /// Submits an order against `account_id` under the façade's per-account
    /// lock. On a fill, persists the mutated account with margin recomputed
    /// from the post-trade positions; on a rejection or a non-fill, the
    /// account is left untouched.
    pub async fn submit_order(
        &self,
        account_id: &str,
        order: &MultiLegOrder,
        as_of: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, EngineError> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let mut account = self.load_account(account_id).await?;
        if self.auto_process_expirations && has_expired_options(&account, as_of) {
            self.process_and_persist_expirations(&mut account, as_of).await?;
        }

        let outcome = execution::execute_order(&mut account, order, &self.default_estimator, self.quotes.as_ref(), as_of)
            .map_err(|err| {
                warn!(account_id, error = %err, "order rejected");
                err
            })?;
        if matches!(outcome, ExecutionOutcome::Filled { .. }) {
            account.maintenance_margin = self.recompute_margin(&account);
            account.updated_at = as_of;
            self.store.save(&account).await.map_err(|err| {
                error!(account_id, error = %err, "persisting account after fill failed");
                err
            })?;
        }
        Ok(outcome)
    }

    /// Runs §4.F against `account` in place and persists the result before
    /// returning, so the caller continues with a post-settlement snapshot
    /// equivalent to a fresh reload.
    async fn process_and_persist_expirations(
        &self,
        account: &mut Account,
        as_of: DateTime<Utc>,
    ) -> Result<ExpirationResult, EngineError> {
        let result = expiration::process_expirations(account, self.quotes.as_ref(), as_of).map_err(|err| {
            error!(account_id = %account.id, error = %err, "pre-order expiration settlement failed");
            err
        })?;
        account.maintenance_margin = self.recompute_margin(account);
        account.updated_at = as_of;
        self.store.save(account).await?;
        Ok(result)
    }

    /// Prices and validates `order` against `account_id`'s current state
    /// without ever persisting the result, win or lose.
    pub async fn simulate_order(
        &self,
        account_id: &str,
        order: &MultiLegOrder,
        as_of: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, EngineError> {
        let mut account = self.load_account(account_id).await?;
        execution::execute_order(&mut account, order, &self.default_estimator, self.quotes.as_ref(), as_of)
    }

    /// Settles every expired option position as of `processing_date` and
    /// persists the result under the account lock.
    pub async fn run_expirations(&self, account_id: &str, processing_date: DateTime<Utc>) -> Result<ExpirationResult, EngineError> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let mut account = self.load_account(account_id).await?;
        let result = self.process_and_persist_expirations(&mut account, processing_date).await?;
        Ok(result)
    }

    /// The account's positions as a plain list.
    pub async fn positions(&self, account_id: &str) -> Result<Vec<Position>, EngineError> {
        let account = self.load_account(account_id).await?;
        Ok(account.positions.into_values().collect())
    }

    /// Strategies recognised from the account's current positions.
    pub async fn strategies(&self, account_id: &str) -> Result<Vec<Strategy>, EngineError> {
        let account = self.load_account(account_id).await?;
        Ok(recognise(&account.positions))
    }

    /// Maintenance margin recomputed from the account's current positions
    /// and live quotes.
    pub async fn margin(&self, account_id: &str) -> Result<Decimal, EngineError> {
        let account = self.load_account(account_id).await?;
        Ok(self.recompute_margin(&account))
    }

    /// Cash plus the market value of every priced position.
    pub async fn portfolio_value(&self, account_id: &str) -> Result<Decimal, EngineError> {
        let account = self.load_account(account_id).await?;
        Ok(account.portfolio_value())
    }

    /// A combined cash/value/margin/strategies read in one round trip.
    pub async fn account_summary(&self, account_id: &str) -> Result<AccountSummary, EngineError> {
        let account = self.load_account(account_id).await?;
        let strategies = recognise(&account.positions);
        let maintenance_margin = calculate_margin(&strategies, &account.positions, self.quotes.as_ref());
        let unrealised_pnl = account.positions.values().filter_map(|p| p.unrealised_pnl()).sum();
        Ok(AccountSummary {
            account_id: account_id.to_string(),
            cash_balance: account.cash_balance,
            portfolio_value: account.portfolio_value(),
            unrealised_pnl,
            maintenance_margin,
            strategies,
        })
    }

    fn recompute_margin(&self, account: &Account) -> Decimal {
        let strategies = recognise(&account.positions);
        calculate_margin(&strategies, &account.positions, self.quotes.as_ref())
    }

    /// Every account id currently known to the underlying store.
    pub async fn list_accounts(&self) -> Result<Vec<String>, EngineError> {
        self.store.list_ids().await
    }

    /// [`Broker::account_summary`] for every known account, fetched
    /// concurrently rather than one round trip per account.
    pub async fn all_account_summaries(&self) -> Result<Vec<AccountSummary>, EngineError> {
        let ids = self.list_accounts().await?;
        let summaries = future::join_all(ids.iter().map(|id| self.account_summary(id))).await;
        summaries.into_iter().collect()
    }
}

/// True if `account` holds an option position expired as of `as_of`'s date,
/// the trigger condition for §4.E step 1's expiration pre-processing.
fn has_expired_options(account: &Account, as_of: DateTime<Utc>) -> bool {
    let today = as_of.date_naive();
    account.positions.values().any(|position| match &position.asset {
        Asset::Option(opt) => days_to_expiration(opt.expiration, today) <= 0,
        Asset::Stock { .. } => false,
    })
}

/// A process-local [`AccountStore`] backed by a `tokio::sync::RwLock`-guarded
/// map. Sufficient for tests and single-process deployments; a real
/// deployment swaps in a database-backed implementation of the same trait.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountStore {
    /// An empty store.
    pub fn new() -> Self {
        InMemoryAccountStore { accounts: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn load(&self, account_id: &str) -> Result<Option<Account>, EngineError> {
        Ok(self.accounts.read().await.get(account_id).cloned())
    }

    async fn save(&self, account: &Account) -> Result<(), EngineError> {
        self.accounts.write().await.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.accounts.read().await.keys().cloned().collect())
    }
}

/// A process-local [`OrderBook`] backed by a `tokio::sync::RwLock`-guarded
/// map, keyed by a generated [`uuid::Uuid`] per resting order. Sufficient
/// for tests and simple deployments; a real venue integration swaps in a
/// persistent implementation of the same trait.
#[derive(Debug, Default)]
pub struct InMemoryOrderBook {
    resting: RwLock<HashMap<String, Vec<(String, MultiLegOrder)>>>,
}

impl InMemoryOrderBook {
    /// An empty order book.
    pub fn new() -> Self {
        InMemoryOrderBook { resting: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl OrderBook for InMemoryOrderBook {
    async fn rest(&self, account_id: &str, order: MultiLegOrder) -> Result<String, EngineError> {
        let order_id = uuid::Uuid::new_v4().to_string();
        self.resting
            .write()
            .await
            .entry(account_id.to_string())
            .or_default()
            .push((order_id.clone(), order));
        Ok(order_id)
    }

    async fn cancel(&self, account_id: &str, order_id: &str) -> Result<(), EngineError> {
        let mut resting = self.resting.write().await;
        let Some(orders) = resting.get_mut(account_id) else {
            return Ok(());
        };
        orders.retain(|(id, _)| id != order_id);
        Ok(())
    }

    async fn pending(&self, account_id: &str) -> Result<Vec<MultiLegOrder>, EngineError> {
        Ok(self
            .resting
            .read()
            .await
            .get(account_id)
            .map(|orders| orders.iter().map(|(_, order)| order.clone()).collect())
            .unwrap_or_default())
    }
}
