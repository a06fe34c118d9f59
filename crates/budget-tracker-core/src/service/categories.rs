use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::db::{BudgetRepository, TransactionRepository};
use crate::error::Result;
use crate::models::{CategorySpending, CategoryStats};

use super::transactions::months_ago;

/// Categories are derived from transactions; there is no category table.
#[derive(Clone)]
pub struct CategoryService {
    transactions: TransactionRepository,
    budgets: BudgetRepository,
    clock: Arc<dyn Clock>,
}

impl CategoryService {
    pub fn new(
        transactions: TransactionRepository,
        budgets: BudgetRepository,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transactions,
            budgets,
            clock,
        }
    }

    pub async fn all_categories(&self) -> Result<Vec<String>> {
        self.transactions.all_categories().await
    }

    /// Categories the customer can budget for
    pub async fn available_categories(&self, cif_id: &str) -> Result<Vec<String>> {
        self.transactions.categories_for_owner(cif_id).await
    }

    /// Spending per category over the last 12 months, flagged with budget coverage
    pub async fn category_stats(&self, cif_id: &str) -> Result<Vec<CategoryStats>> {
        info!(cif_id, "Fetching category statistics");

        let now = self.clock.now();
        let spending = self
            .transactions
            .spending_by_category(cif_id, months_ago(now, 12), now)
            .await?;
        let budgeted: HashSet<String> = self
            .budgets
            .active_categories(cif_id)
            .await?
            .into_iter()
            .collect();

        Ok(category_stats(spending, &budgeted))
    }
}

pub fn category_stats(spending: Vec<CategorySpending>, budgeted: &HashSet<String>) -> Vec<CategoryStats> {
    spending
        .into_iter()
        .map(|s| CategoryStats {
            has_budget: budgeted.contains(&s.category),
            category_name: s.category,
            transaction_count: s.transaction_count,
            total_spending: s.total_amount,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_category_stats_marks_budgeted() {
        let spending = vec![
            CategorySpending {
                category: "Food".to_string(),
                total_amount: dec!(4200),
                transaction_count: 14,
            },
            CategorySpending {
                category: "Transport".to_string(),
                total_amount: dec!(900),
                transaction_count: 6,
            },
        ];
        let budgeted = HashSet::from(["Food".to_string()]);

        let stats = category_stats(spending, &budgeted);

        assert!(stats[0].has_budget);
        assert!(!stats[1].has_budget);
        assert_eq!(stats[1].transaction_count, 6);
        assert_eq!(stats[0].total_spending, dec!(4200));
    }
}
