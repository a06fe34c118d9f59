use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::clock::Clock;
use crate::db::TransactionRepository;
use crate::error::{Error, Result};
use crate::models::*;

use super::fixed;
use super::transactions::months_ago;

const TREND_MONTHS: u32 = 6;
const INSIGHT_TREND_MONTHS: u32 = 3;
const TOP_MERCHANTS: i64 = 5;

#[derive(Clone)]
pub struct AnalyticsService {
    transactions: TransactionRepository,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(transactions: TransactionRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions,
            clock,
        }
    }

    pub async fn spending_analytics(
        &self,
        cif_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SpendingAnalytics> {
        if end < start {
            return Err(Error::validation("End date must not be before start date"));
        }

        info!(cif_id, %start, %end, "Generating spending analytics");

        let (from, to) = day_bounds(start, end);
        let total_spending = self.transactions.total_expenses(cif_id, from, to).await?;
        let category_breakdown = self.transactions.spending_by_category(cif_id, from, to).await?;
        let monthly_trend = self.monthly_trend(cif_id, TREND_MONTHS).await?;
        let top_merchants = self
            .transactions
            .top_merchants(cif_id, from, to, TOP_MERCHANTS)
            .await?;

        let days = (end - start).num_days() + 1;
        let insights = spending_insights(total_spending, &category_breakdown, &monthly_trend);
        let (top_category, top_category_amount) = category_breakdown
            .first()
            .map(|c| (Some(c.category.clone()), c.total_amount))
            .unwrap_or((None, Decimal::ZERO));

        Ok(SpendingAnalytics {
            cif_id: cif_id.to_string(),
            start_date: start,
            end_date: end,
            total_spending,
            average_daily_spending: average_daily_spending(total_spending, days),
            top_category,
            top_category_amount,
            category_breakdown,
            monthly_trend,
            top_merchants,
            insights,
        })
    }

    /// Debit totals per category over an inclusive date range, largest first
    pub async fn category_breakdown(
        &self,
        cif_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CategorySpending>> {
        if end < start {
            return Err(Error::validation("End date must not be before start date"));
        }
        let (from, to) = day_bounds(start, end);
        self.transactions.spending_by_category(cif_id, from, to).await
    }

    /// Income and expenses per month for the last `months` months, latest first
    pub async fn monthly_trend(&self, cif_id: &str, months: u32) -> Result<Vec<MonthlyTrend>> {
        let start_of_today = self.clock.today().and_time(NaiveTime::MIN).and_utc();
        self.transactions
            .monthly_trend(cif_id, months_ago(start_of_today, months))
            .await
    }

    /// Insights over the last month of activity
    pub async fn insights(&self, cif_id: &str) -> Result<Vec<SpendingInsight>> {
        let now = self.clock.now();
        let month_ago: DateTime<Utc> = months_ago(now, 1);

        let total = self.transactions.total_expenses(cif_id, month_ago, now).await?;
        let categories = self
            .transactions
            .spending_by_category(cif_id, month_ago, now)
            .await?;
        let trend = self.monthly_trend(cif_id, INSIGHT_TREND_MONTHS).await?;

        Ok(spending_insights(total, &categories, &trend))
    }
}

/// `total / days` to two places, half-up
pub fn average_daily_spending(total: Decimal, days: i64) -> Decimal {
    if days <= 0 {
        return total;
    }
    total
        .checked_div(Decimal::from(days))
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rule-based insights. `categories` is sorted by amount descending and
/// `trend` by month descending.
pub fn spending_insights(
    total_spending: Decimal,
    categories: &[CategorySpending],
    trend: &[MonthlyTrend],
) -> Vec<SpendingInsight> {
    let mut insights = Vec::new();

    if let Some(top) = categories.first() {
        if total_spending > Decimal::ZERO {
            let share = top
                .total_amount
                .checked_div(total_spending)
                .unwrap_or_default()
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                * Decimal::ONE_HUNDRED;

            insights.push(SpendingInsight {
                insight_type: InsightType::SpendPattern,
                message: format!(
                    "Your highest spending category is {} ({}% of total spending)",
                    top.category,
                    fixed(share, 1)
                ),
                recommendation: Some("Consider setting a budget for this category".to_string()),
                potential_savings: None,
                priority: InsightPriority::High,
            });
        }
    }

    if let [latest, previous, ..] = trend {
        let change = latest.expenses - previous.expenses;
        if change > Decimal::ZERO {
            insights.push(SpendingInsight {
                insight_type: InsightType::SpendPattern,
                message: format!(
                    "Your spending increased by KES {} compared to last month",
                    fixed(change, 2)
                ),
                recommendation: Some(
                    "Review your recent purchases to identify any unusual spending".to_string(),
                ),
                potential_savings: None,
                priority: InsightPriority::Medium,
            });
        } else if change < Decimal::ZERO {
            insights.push(SpendingInsight {
                insight_type: InsightType::SavingsTip,
                message: format!(
                    "Great job! You saved KES {} compared to last month",
                    fixed(change.abs(), 2)
                ),
                recommendation: None,
                potential_savings: Some(change.abs()),
                priority: InsightPriority::Low,
            });
        }
    }

    if categories.len() > 3 {
        insights.push(SpendingInsight {
            insight_type: InsightType::BudgetRecommendation,
            message: "You're spending across multiple categories".to_string(),
            recommendation: Some(
                "Consider creating budgets for your top 3 spending categories".to_string(),
            ),
            potential_savings: None,
            priority: InsightPriority::Medium,
        });
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn spending(category: &str, amount: Decimal) -> CategorySpending {
        CategorySpending {
            category: category.to_string(),
            total_amount: amount,
            transaction_count: 1,
        }
    }

    fn month(m: u32, expenses: Decimal) -> MonthlyTrend {
        MonthlyTrend {
            month: NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
            income: dec!(50000),
            expenses,
        }
    }

    #[rstest]
    #[case(dec!(3100), 31, dec!(100.00))]
    #[case(dec!(1000), 3, dec!(333.33))]
    #[case(dec!(2000), 3, dec!(666.67))]
    #[case(dec!(0), 30, dec!(0))]
    fn test_average_daily_spending(#[case] total: Decimal, #[case] days: i64, #[case] expected: Decimal) {
        assert_eq!(average_daily_spending(total, days), expected);
    }

    #[test]
    fn test_top_category_share() {
        let categories = vec![spending("Food", dec!(4500)), spending("Transport", dec!(1500))];

        let insights = spending_insights(dec!(6000), &categories, &[]);

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].priority, InsightPriority::High);
        assert_eq!(
            insights[0].message,
            "Your highest spending category is Food (75.0% of total spending)"
        );
    }

    #[test]
    fn test_zero_total_does_not_divide() {
        let categories = vec![spending("Food", dec!(0))];
        let insights = spending_insights(Decimal::ZERO, &categories, &[]);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_month_over_month_increase() {
        let trend = vec![month(3, dec!(12500.5)), month(2, dec!(10000))];

        let insights = spending_insights(Decimal::ZERO, &[], &trend);

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].insight_type, InsightType::SpendPattern);
        assert_eq!(insights[0].priority, InsightPriority::Medium);
        assert_eq!(
            insights[0].message,
            "Your spending increased by KES 2500.50 compared to last month"
        );
    }

    #[test]
    fn test_month_over_month_decrease() {
        let trend = vec![month(3, dec!(8000)), month(2, dec!(10000))];

        let insights = spending_insights(Decimal::ZERO, &[], &trend);

        assert_eq!(insights[0].insight_type, InsightType::SavingsTip);
        assert_eq!(insights[0].priority, InsightPriority::Low);
        assert_eq!(
            insights[0].message,
            "Great job! You saved KES 2000.00 compared to last month"
        );
        assert_eq!(insights[0].potential_savings, Some(dec!(2000)));
    }

    #[test]
    fn test_flat_trend_and_single_month_add_nothing() {
        let flat = vec![month(3, dec!(10000)), month(2, dec!(10000))];
        assert!(spending_insights(Decimal::ZERO, &[], &flat).is_empty());
        assert!(spending_insights(Decimal::ZERO, &[], &flat[..1]).is_empty());
    }

    #[test]
    fn test_many_categories_recommend_budgets() {
        let categories = vec![
            spending("Food", dec!(400)),
            spending("Transport", dec!(300)),
            spending("Utilities", dec!(200)),
            spending("Leisure", dec!(100)),
        ];

        let insights = spending_insights(dec!(1000), &categories, &[]);

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[1].insight_type, InsightType::BudgetRecommendation);
        assert_eq!(insights[0].message, "Your highest spending category is Food (40.0% of total spending)");
    }
}
