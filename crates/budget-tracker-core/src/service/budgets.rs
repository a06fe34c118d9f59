use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};
use uuid::Uuid;

use crate::alerting::{percentage_used, SweepReport, ThresholdEvaluator};
use crate::clock::Clock;
use crate::db::{BudgetRepository, TransactionRepository};
use crate::error::{Error, Result};
use crate::models::*;

#[derive(Clone)]
pub struct BudgetService {
    budgets: BudgetRepository,
    transactions: TransactionRepository,
    evaluator: Arc<ThresholdEvaluator>,
    clock: Arc<dyn Clock>,
}

impl BudgetService {
    pub fn new(
        budgets: BudgetRepository,
        transactions: TransactionRepository,
        evaluator: Arc<ThresholdEvaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            budgets,
            transactions,
            evaluator,
            clock,
        }
    }

    pub async fn create_budget(&self, input: BudgetInput) -> Result<BudgetResponse> {
        input.validate()?;

        info!(cif_id = %input.cif_id, category = %input.category, "Creating budget");

        let available = self.transactions.categories_for_owner(&input.cif_id).await?;
        if !available.iter().any(|c| c == &input.category) {
            return Err(Error::invalid_budget(format!(
                "Category '{}' not found in your transactions. Available categories: {}",
                input.category,
                available.join(", ")
            )));
        }

        let end_date = input.resolved_end_date();
        let overlapping = self
            .budgets
            .find_overlapping(&input.cif_id, &input.category, input.start_date, end_date)
            .await?;
        if !overlapping.is_empty() {
            return Err(Error::invalid_budget(format!(
                "A budget already exists for category '{}' in the period {} to {}",
                input.category, input.start_date, end_date
            )));
        }

        let budget = input.into_budget(self.clock.now());
        let saved = self.budgets.create(&budget).await?;

        info!(budget_id = %saved.id, "Budget created");

        self.enrich(saved).await
    }

    pub async fn update_budget(&self, id: Uuid, update: BudgetUpdate) -> Result<BudgetResponse> {
        update.validate()?;

        let mut budget = self
            .budgets
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("Budget", id))?;

        update.apply(&mut budget, self.clock.now())?;

        let saved = self
            .budgets
            .update(&budget)
            .await?
            .ok_or_else(|| Error::not_found("Budget", id))?;

        info!(budget_id = %id, "Budget updated");

        self.enrich(saved).await
    }

    pub async fn get_budget(&self, id: Uuid) -> Result<BudgetResponse> {
        let budget = self
            .budgets
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("Budget", id))?;

        self.enrich(budget).await
    }

    pub async fn list_active_budgets(&self, cif_id: &str) -> Result<Vec<BudgetResponse>> {
        debug!(cif_id, "Fetching active budgets");

        let budgets = self.budgets.list_active_by_owner(cif_id).await?;

        let mut responses = Vec::with_capacity(budgets.len());
        for budget in budgets {
            responses.push(self.enrich(budget).await?);
        }
        Ok(responses)
    }

    /// Soft delete
    pub async fn delete_budget(&self, id: Uuid) -> Result<()> {
        if !self.budgets.soft_delete(id, self.clock.now()).await? {
            return Err(Error::not_found("Budget", id));
        }

        info!(budget_id = %id, "Budget deactivated");
        Ok(())
    }

    /// Budgets active on `start`, measured against spending in `[start, end]`
    pub async fn budget_summary(
        &self,
        cif_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BudgetSummary> {
        if end < start {
            return Err(Error::validation("End date must not be before start date"));
        }

        info!(cif_id, %start, %end, "Generating budget summary");

        let (from, to) = day_bounds(start, end);
        let budgets = self.budgets.list_active_for_date(cif_id, start).await?;
        let total_income = self.transactions.total_income(cif_id, from, to).await?;
        let total_expenses = self.transactions.total_expenses(cif_id, from, to).await?;

        let mut breakdown = Vec::with_capacity(budgets.len());
        for budget in &budgets {
            let spending = self
                .transactions
                .category_spending(&budget.cif_id, &budget.category, from, to)
                .await?;
            breakdown.push(category_summary(budget, spending));
        }

        let total_budget: Decimal = budgets.iter().map(|b| b.budget_amount).sum();
        let total_spending: Decimal = breakdown.iter().map(|c| c.spending).sum();
        let insights = budget_insights(&breakdown, total_income, total_expenses);

        Ok(BudgetSummary {
            cif_id: cif_id.to_string(),
            period_start: start,
            period_end: end,
            total_income,
            total_expenses,
            total_budget,
            total_spending,
            remaining_budget: total_budget - total_spending,
            budget_utilization_percentage: percentage_used(total_spending, total_budget),
            category_breakdown: breakdown,
            insights,
        })
    }

    /// Evaluate every active budget of the customer for alerts
    pub async fn check_alerts(&self, cif_id: &str) -> Result<SweepReport> {
        info!(cif_id, "Checking budget alerts");
        self.evaluator.check_owner(cif_id).await
    }

    async fn enrich(&self, budget: Budget) -> Result<BudgetResponse> {
        let (from, to) = budget.spending_window();
        let spending = self
            .transactions
            .category_spending(&budget.cif_id, &budget.category, from, to)
            .await?;

        Ok(budget_response(budget, spending, self.clock.today()))
    }
}

/// Budget with its spending-derived fields
pub fn budget_response(budget: Budget, spending: Decimal, today: NaiveDate) -> BudgetResponse {
    let pct = percentage_used(spending, budget.budget_amount);
    BudgetResponse {
        current_spending: spending,
        remaining_budget: budget.budget_amount - spending,
        percentage_used: pct,
        status: BudgetStatus::from_percentage(pct),
        days_remaining: budget.days_remaining(today),
        budget,
    }
}

pub fn category_summary(budget: &Budget, spending: Decimal) -> CategoryBudgetSummary {
    let pct = percentage_used(spending, budget.budget_amount);
    CategoryBudgetSummary {
        category: budget.category.clone(),
        budget_amount: budget.budget_amount,
        spending,
        remaining: budget.budget_amount - spending,
        percentage_used: pct,
        status: BudgetStatus::from_percentage(pct),
    }
}

/// Textual observations for a budget summary
pub fn budget_insights(
    categories: &[CategoryBudgetSummary],
    total_income: Decimal,
    total_expenses: Decimal,
) -> Vec<String> {
    let mut insights = Vec::new();

    let names_with = |status: BudgetStatus| {
        categories
            .iter()
            .filter(|c| c.status == status)
            .map(|c| c.category.as_str())
            .collect::<Vec<_>>()
    };

    let over = names_with(BudgetStatus::Exceeded);
    if !over.is_empty() {
        insights.push(format!("⚠️ Over budget in: {}", over.join(", ")));
    }

    let near = names_with(BudgetStatus::Warning);
    if !near.is_empty() {
        insights.push(format!("⚡ Approaching limit in: {}", near.join(", ")));
    }

    if total_income > Decimal::ZERO {
        if let Some(ratio) = (total_income - total_expenses).checked_div(total_income) {
            let rate = ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                * Decimal::ONE_HUNDRED;
            insights.push(format!("💰 Savings rate: {}%", super::fixed(rate, 1)));
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn budget(category: &str, amount: Decimal) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            cif_id: "CIF001".to_string(),
            category: category.to_string(),
            budget_amount: amount,
            period_type: PeriodType::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            state: BudgetState::Active,
            alert_threshold_80: true,
            alert_threshold_100: true,
            rollover_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_budget_response_fields() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        let response = budget_response(budget("Food", dec!(10000)), dec!(8500), today);

        assert_eq!(response.percentage_used, 85);
        assert_eq!(response.remaining_budget, dec!(1500));
        assert_eq!(response.status, BudgetStatus::Warning);
        assert_eq!(response.days_remaining, 10);
    }

    #[test]
    fn test_overspent_budget_has_negative_remaining() {
        let summary = category_summary(&budget("Transport", dec!(2000)), dec!(2600));

        assert_eq!(summary.remaining, dec!(-600));
        assert_eq!(summary.percentage_used, 130);
        assert_eq!(summary.status, BudgetStatus::Exceeded);
    }

    #[test]
    fn test_zero_amount_budget_is_on_track() {
        let summary = category_summary(&budget("Gifts", Decimal::ZERO), dec!(300));
        assert_eq!(summary.percentage_used, 0);
        assert_eq!(summary.status, BudgetStatus::OnTrack);
    }

    #[test]
    fn test_budget_insights() {
        let categories = vec![
            category_summary(&budget("Food", dec!(10000)), dec!(12000)),
            category_summary(&budget("Transport", dec!(2000)), dec!(1700)),
            category_summary(&budget("Utilities", dec!(5000)), dec!(1000)),
        ];

        let insights = budget_insights(&categories, dec!(60000), dec!(40000));

        assert_eq!(
            insights,
            vec![
                "⚠️ Over budget in: Food".to_string(),
                "⚡ Approaching limit in: Transport".to_string(),
                "💰 Savings rate: 33.0%".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_savings_rate_without_income() {
        let insights = budget_insights(&[], Decimal::ZERO, dec!(500));
        assert!(insights.is_empty());
    }

    #[test]
    fn test_negative_savings_rate() {
        let insights = budget_insights(&[], dec!(1000), dec!(1500));
        assert_eq!(insights, vec!["💰 Savings rate: -50.0%".to_string()]);
    }
}
