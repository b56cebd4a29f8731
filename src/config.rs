/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Environment-driven tunables that are ambient rather than domain data.
//!
//! The façade takes its collaborators by constructor injection (quote
//! source, account store, estimator) — nothing here drives behaviour inside
//! the core. This module only picks sensible defaults for the binaries and
//! tests that wire the core together.

use crate::pricing::{Estimator, estimator_preset};
use std::env;

/// Name of the environment variable [`crate::utils::setup_logger`] reads.
pub const LOG_LEVEL_VAR: &str = "PAPERBROKER_LOG";

/// Name of the environment variable consulted by [`default_estimator`].
pub const DEFAULT_ESTIMATOR_VAR: &str = "PAPERBROKER_ESTIMATOR";

/// The estimator preset used when no explicit estimator is configured.
///
/// Reads `PAPERBROKER_ESTIMATOR` (any name accepted by
/// [`estimator_preset`] or [`crate::pricing::estimator_for_name`]); falls
/// back to [`Estimator::Midpoint`] when unset or unrecognised.
pub fn default_estimator() -> Estimator {
    env::var(DEFAULT_ESTIMATOR_VAR)
        .ok()
        .and_then(|name| estimator_preset(&name).or_else(|| crate::pricing::estimator_for_name(&name)))
        .unwrap_or(Estimator::Midpoint)
}
