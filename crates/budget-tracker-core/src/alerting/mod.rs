//! Budget threshold alerting
//!
//! Evaluates budgets against their spending, creates deduplicated alerts, and
//! runs the periodic sweep over every active budget.

mod evaluator;
mod message;
mod repository;
mod threshold;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{AlertType, Budget, BudgetAlert};

pub use evaluator::{BudgetFailure, SweepReport, ThresholdEvaluator};
pub use message::render_alert_message;
pub use repository::AlertRepository;
pub use threshold::{candidate_alerts, percentage_used};

/// Spending aggregated from the transaction store
#[async_trait]
pub trait SpendingSource: Send + Sync {
    /// Sum of absolute debit amounts for one owner and category in
    /// `[start, end]`. `None` when nothing matched.
    async fn category_spending(
        &self,
        cif_id: &str,
        category: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Decimal>>;
}

/// Budgets the evaluator works over
#[async_trait]
pub trait BudgetSource: Send + Sync {
    /// Active budgets of one owner
    async fn active_budgets_for_owner(&self, cif_id: &str) -> Result<Vec<Budget>>;

    /// Active budgets covering `today` with at least one alert toggle on
    async fn budgets_requiring_alert_check(&self, today: NaiveDate) -> Result<Vec<Budget>>;
}

/// Persistence for created alerts
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Whether an alert of this type was delivered for the budget at or after `since`
    async fn has_alert_been_sent(
        &self,
        budget_id: uuid::Uuid,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<bool>;

    async fn insert_alert(&self, alert: &BudgetAlert) -> Result<BudgetAlert>;
}
