//! # Budget Tracker
//!
//! Budget threshold and alert engine for a retail banking back office.
//!
//! Customers set spending limits per transaction category. The engine
//! measures debit spending against each limit and records an alert the
//! first time a budget crosses 80% and again when it reaches or exceeds
//! 100%, suppressing duplicates inside a configurable window.
//!
//! ## Architecture
//!
//! - **Alerting**: threshold evaluation, message rendering and alert storage
//! - **Service**: budget, transaction, category and analytics operations
//! - **Storage**: PostgreSQL via sqlx
//! - **API**: REST API for queries and management
//!
//! ## Quick Start
//!
//! ```bash
//! # Apply migrations
//! budget-tracker migrate
//!
//! # Start the HTTP API and the periodic sweep
//! budget-tracker serve
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod alerting;
pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{SweepReport, ThresholdEvaluator};
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::Config;
    pub use crate::db::Database;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}
