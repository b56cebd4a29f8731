//! # Utils Module
//!
//! General-purpose ambient utilities shared across the crate.
//!
//! ## Logger (`logger.rs`)
//!
//! Provides logging setup with configurable log levels:
//!
//! ```rust
//! use paperbroker::utils::logger::{setup_logger, setup_logger_with_level};
//!
//! setup_logger();
//! setup_logger_with_level("DEBUG");
//! ```

pub mod logger;

pub use logger::{setup_logger, setup_logger_with_level};
