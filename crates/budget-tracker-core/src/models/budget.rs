//! Budget data models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Smallest amount a budget may be created or updated with
pub const MIN_BUDGET_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Cadence a budget's date range represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
    /// No custom duration exists yet; uses monthly arithmetic
    Custom,
}

impl PeriodType {
    /// Stored representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Yearly => "YEARLY",
            Self::Custom => "CUSTOM",
        }
    }

    /// Inclusive end date of a period starting on `start`.
    ///
    /// Month arithmetic clamps to the last day of the target month, so a
    /// monthly budget starting on January 31st ends on February 28th/29th
    /// minus one day. Saturates at `NaiveDate::MAX`.
    pub fn end_date(self, start: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => start,
            Self::Weekly => start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX),
            Self::Monthly | Self::Custom => add_months_inclusive(start, 1),
            Self::Quarterly => add_months_inclusive(start, 3),
            Self::Yearly => add_months_inclusive(start, 12),
        }
    }
}

fn add_months_inclusive(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "QUARTERLY" => Ok(Self::Quarterly),
            "YEARLY" => Ok(Self::Yearly),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(Error::validation(format!("Unknown period type: {other}"))),
        }
    }
}

/// Lifecycle state of a budget. Budgets are never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetState {
    #[default]
    Active,
    Inactive,
}

impl BudgetState {
    /// Map the stored `is_active` flag to a state
    pub fn from_active(is_active: bool) -> Self {
        if is_active {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Utilisation status of a budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    OnTrack,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    /// Classify a whole-number utilisation percentage
    pub fn from_percentage(percentage_used: u32) -> Self {
        if percentage_used >= 100 {
            Self::Exceeded
        } else if percentage_used >= 80 {
            Self::Warning
        } else {
            Self::OnTrack
        }
    }
}

/// A customer budget for one spending category over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Unique identifier
    pub id: Uuid,

    /// Owning customer (CIF)
    pub cif_id: String,

    /// Transaction category this budget tracks (e.g. "Food, drinks")
    pub category: String,

    /// Spending limit for the period
    pub budget_amount: Decimal,

    pub period_type: PeriodType,

    /// First day of the period (inclusive)
    pub start_date: NaiveDate,

    /// Last day of the period (inclusive)
    pub end_date: NaiveDate,

    pub state: BudgetState,

    /// Alert when 80% of the budget is used
    pub alert_threshold_80: bool,

    /// Alert when the budget is fully used or exceeded
    pub alert_threshold_100: bool,

    /// Carry unused amount into the next period (not evaluated yet)
    pub rollover_enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether `date` falls inside the budget period
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Instant range spending is aggregated over: start of the first day to
    /// the last second of the final day.
    pub fn spending_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        day_bounds(self.start_date, self.end_date)
    }

    /// Whole days from `today` until the end of the period (negative once over)
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }
}

/// Convert an inclusive date range into `[start 00:00:00, end 23:59:59]` UTC
pub fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(end_of_day).and_utc(),
    )
}

fn default_true() -> bool {
    true
}

/// Input for creating a new budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetInput {
    pub cif_id: String,
    pub category: String,
    pub budget_amount: Decimal,
    pub period_type: PeriodType,
    pub start_date: NaiveDate,
    /// Derived from the period type when omitted
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub alert_threshold_80: bool,
    #[serde(default = "default_true")]
    pub alert_threshold_100: bool,
    #[serde(default)]
    pub rollover_enabled: bool,
}

impl BudgetInput {
    /// Check field-level constraints
    pub fn validate(&self) -> Result<()> {
        if self.cif_id.trim().is_empty() {
            return Err(Error::validation("Customer ID is required"));
        }
        if self.category.trim().is_empty() {
            return Err(Error::validation("Category is required"));
        }
        if self.budget_amount < MIN_BUDGET_AMOUNT {
            return Err(Error::validation("Budget amount must be greater than 0"));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(Error::validation("End date must be after start date"));
            }
        }
        Ok(())
    }

    /// Explicit end date, or the one implied by the period type
    pub fn resolved_end_date(&self) -> NaiveDate {
        self.end_date
            .unwrap_or_else(|| self.period_type.end_date(self.start_date))
    }

    /// Build an active budget from this input
    pub fn into_budget(self, now: DateTime<Utc>) -> Budget {
        let end_date = self.resolved_end_date();
        Budget {
            id: Uuid::new_v4(),
            cif_id: self.cif_id,
            category: self.category,
            budget_amount: self.budget_amount,
            period_type: self.period_type,
            start_date: self.start_date,
            end_date,
            state: BudgetState::Active,
            alert_threshold_80: self.alert_threshold_80,
            alert_threshold_100: self.alert_threshold_100,
            rollover_enabled: self.rollover_enabled,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of the mutable budget fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub budget_amount: Option<Decimal>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub alert_threshold_80: Option<bool>,
    pub alert_threshold_100: Option<bool>,
    pub rollover_enabled: Option<bool>,
}

impl BudgetUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.budget_amount {
            if amount < MIN_BUDGET_AMOUNT {
                return Err(Error::validation("Budget amount must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Apply the provided fields to `budget`
    pub fn apply(&self, budget: &mut Budget, now: DateTime<Utc>) -> Result<()> {
        self.validate()?;

        if let Some(amount) = self.budget_amount {
            budget.budget_amount = amount;
        }
        if let Some(end) = self.end_date {
            if end < budget.start_date {
                return Err(Error::validation("End date must be after start date"));
            }
            budget.end_date = end;
        }
        if let Some(active) = self.is_active {
            budget.state = BudgetState::from_active(active);
        }
        if let Some(flag) = self.alert_threshold_80 {
            budget.alert_threshold_80 = flag;
        }
        if let Some(flag) = self.alert_threshold_100 {
            budget.alert_threshold_100 = flag;
        }
        if let Some(flag) = self.rollover_enabled {
            budget.rollover_enabled = flag;
        }

        budget.updated_at = now;
        Ok(())
    }
}

/// Budget enriched with its current spending
#[derive(Debug, Clone, Serialize)]
pub struct BudgetResponse {
    #[serde(flatten)]
    pub budget: Budget,
    pub current_spending: Decimal,
    pub remaining_budget: Decimal,
    pub percentage_used: u32,
    pub status: BudgetStatus,
    pub days_remaining: i64,
}
