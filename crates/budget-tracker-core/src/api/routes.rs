//! API routes

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{self, alerts, analytics, budgets, categories, transactions, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Budgets
        .route("/api/v1/budgets", post(budgets::create_budget))
        .route(
            "/api/v1/budgets/:id",
            get(budgets::get_budget)
                .put(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route("/api/v1/budgets/customer/:cif_id", get(budgets::list_active_budgets))
        .route("/api/v1/budgets/customer/:cif_id/summary", get(budgets::budget_summary))
        .route("/api/v1/budgets/customer/:cif_id/check-alerts", post(budgets::check_alerts))

        // Alerts
        .route("/api/v1/alerts/customer/:cif_id", get(alerts::list_customer_alerts))
        .route("/api/v1/alerts/unsent", get(alerts::list_unsent_alerts))
        .route("/api/v1/alerts/sent", post(alerts::mark_alerts_sent))
        .route("/api/v1/alerts/:id/sent", post(alerts::mark_alert_sent))

        // Transactions
        .route("/api/v1/transactions/customer/:cif_id", get(transactions::list_transactions))
        .route("/api/v1/transactions/filter", post(transactions::filter_transactions))
        .route(
            "/api/v1/transactions/customer/:cif_id/uncategorized",
            get(transactions::uncategorized_transactions),
        )
        .route(
            "/api/v1/transactions/customer/:cif_id/category/:category/spending",
            get(transactions::category_spending),
        )
        .route("/api/v1/transactions/:id/category", patch(transactions::recategorize_transaction))
        .route("/api/v1/transactions/:id", get(transactions::get_transaction))

        // Categories
        .route("/api/v1/categories", get(categories::all_categories))
        .route("/api/v1/categories/customer/:cif_id", get(categories::customer_categories))
        .route(
            "/api/v1/categories/customer/:cif_id/available",
            get(categories::available_categories),
        )

        // Analytics
        .route("/api/v1/analytics/customer/:cif_id/spending", get(analytics::spending_analytics))
        .route(
            "/api/v1/analytics/customer/:cif_id/category-breakdown",
            get(analytics::category_breakdown),
        )
        .route("/api/v1/analytics/customer/:cif_id/monthly-trend", get(analytics::monthly_trend))
        .route("/api/v1/analytics/customer/:cif_id/insights", get(analytics::insights))

        .with_state(state)
}
