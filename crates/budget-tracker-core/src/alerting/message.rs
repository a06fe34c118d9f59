//! Alert message rendering

use rust_decimal::Decimal;

use crate::models::AlertType;

/// Render the customer-facing text for an alert
pub fn render_alert_message(
    alert_type: AlertType,
    category: &str,
    spending: Decimal,
    budget_amount: Decimal,
    percentage_used: u32,
) -> String {
    format!(
        "Budget alert: {} - You've used {}% ({}) of your {} budget ({})",
        alert_type.description(),
        percentage_used,
        spending,
        category,
        budget_amount
    )
}
