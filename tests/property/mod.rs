//! Property-based tests for the Greeks evaluator.
//!
//! This module contains property-based tests using proptest to verify
//! mathematical invariants and bounds across a wide range of inputs.

mod greeks_bounds_test;
mod put_call_parity_test;
