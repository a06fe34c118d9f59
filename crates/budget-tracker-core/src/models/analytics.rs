//! Reporting and analytics response types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::budget::BudgetStatus;

/// Spending total for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub total_amount: Decimal,
    pub transaction_count: i64,
}

/// Income and expenses for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// First day of the month
    pub month: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightType {
    SpendPattern,
    SavingsTip,
    BudgetRecommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

/// A personalised observation about spending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingInsight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub message: String,
    pub recommendation: Option<String>,
    pub potential_savings: Option<Decimal>,
    pub priority: InsightPriority,
}

/// Spending analytics over a date range
#[derive(Debug, Clone, Serialize)]
pub struct SpendingAnalytics {
    pub cif_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_spending: Decimal,
    pub average_daily_spending: Decimal,
    pub top_category: Option<String>,
    pub top_category_amount: Decimal,
    pub category_breakdown: Vec<CategorySpending>,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub top_merchants: Vec<String>,
    pub insights: Vec<SpendingInsight>,
}

/// Budget utilisation for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBudgetSummary {
    pub category: String,
    pub budget_amount: Decimal,
    pub spending: Decimal,
    pub remaining: Decimal,
    pub percentage_used: u32,
    pub status: BudgetStatus,
}

/// Budget summary for a customer over a date range
#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub cif_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_budget: Decimal,
    pub total_spending: Decimal,
    pub remaining_budget: Decimal,
    pub budget_utilization_percentage: u32,
    pub category_breakdown: Vec<CategoryBudgetSummary>,
    pub insights: Vec<String>,
}

/// Category with the customer's spending statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category_name: String,
    pub transaction_count: i64,
    pub total_spending: Decimal,
    pub has_budget: bool,
}
