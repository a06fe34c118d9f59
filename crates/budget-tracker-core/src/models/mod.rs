//! Data models for the budget tracker

mod alert;
mod analytics;
mod budget;
mod transaction;

pub use alert::*;
pub use analytics::*;
pub use budget::*;
pub use transaction::*;
