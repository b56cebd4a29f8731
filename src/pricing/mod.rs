/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! Price estimation: turning a quote and a signed quantity into a fill price.

pub mod estimators;

pub use estimators::{Estimator, EstimatorError, estimator_for_name, estimator_preset};
