mod analytics;
mod budgets;
mod categories;
mod transactions;

pub use analytics::{average_daily_spending, spending_insights, AnalyticsService};
pub use budgets::{budget_insights, budget_response, category_summary, BudgetService};
pub use categories::{category_stats, CategoryService};
pub use transactions::TransactionService;

use rust_decimal::{Decimal, RoundingStrategy};

/// Half-up rounded to `dp` places, always printed with `dp` digits
fn fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::fixed;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_pads_and_rounds() {
        assert_eq!(fixed(dec!(33), 1), "33.0");
        assert_eq!(fixed(dec!(1250.5), 2), "1250.50");
        assert_eq!(fixed(dec!(0.125), 2), "0.13");
        assert_eq!(fixed(dec!(-2.45), 1), "-2.5");
    }
}
