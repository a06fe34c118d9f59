//! Budget persistence

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::alerting::BudgetSource;
use crate::error::Result;
use crate::models::{Budget, BudgetState, PeriodType};

const BUDGET_COLUMNS: &str = r#"
    id, cif_id, category, budget_amount, period_type, start_date, end_date,
    is_active, alert_threshold_80, alert_threshold_100, rollover_enabled,
    created_at, updated_at
"#;

/// Repository for budgets
#[derive(Clone)]
pub struct BudgetRepository {
    pool: PgPool,
}

impl BudgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new budget
    pub async fn create(&self, budget: &Budget) -> Result<Budget> {
        let row = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            INSERT INTO budgets (
                id, cif_id, category, budget_amount, period_type, start_date, end_date,
                is_active, alert_threshold_80, alert_threshold_100, rollover_enabled,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {BUDGET_COLUMNS}
            "#
        ))
        .bind(budget.id)
        .bind(&budget.cif_id)
        .bind(&budget.category)
        .bind(budget.budget_amount)
        .bind(budget.period_type.as_str())
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.is_active())
        .bind(budget.alert_threshold_80)
        .bind(budget.alert_threshold_100)
        .bind(budget.rollover_enabled)
        .bind(budget.created_at)
        .bind(budget.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a budget by ID, active or not
    pub async fn get(&self, id: Uuid) -> Result<Option<Budget>> {
        let row = sqlx::query_as::<_, BudgetRow>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    /// Persist the mutable fields of an existing budget
    pub async fn update(&self, budget: &Budget) -> Result<Option<Budget>> {
        let row = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            UPDATE budgets SET
                budget_amount = $2,
                end_date = $3,
                is_active = $4,
                alert_threshold_80 = $5,
                alert_threshold_100 = $6,
                rollover_enabled = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING {BUDGET_COLUMNS}
            "#
        ))
        .bind(budget.id)
        .bind(budget.budget_amount)
        .bind(budget.end_date)
        .bind(budget.is_active())
        .bind(budget.alert_threshold_80)
        .bind(budget.alert_threshold_100)
        .bind(budget.rollover_enabled)
        .bind(budget.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    /// Mark a budget inactive; returns false when it does not exist
    pub async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE budgets SET is_active = false, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active budgets of a customer, ordered by category
    pub async fn list_active_by_owner(&self, cif_id: &str) -> Result<Vec<Budget>> {
        let rows = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE cif_id = $1 AND is_active = true
            ORDER BY category
            "#
        ))
        .bind(cif_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Active budgets of a customer whose period contains `date`
    pub async fn list_active_for_date(&self, cif_id: &str, date: NaiveDate) -> Result<Vec<Budget>> {
        let rows = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE cif_id = $1
              AND is_active = true
              AND $2 BETWEEN start_date AND end_date
            ORDER BY category
            "#
        ))
        .bind(cif_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Active budgets for the same customer and category whose period
    /// intersects `[start, end]`
    pub async fn find_overlapping(
        &self,
        cif_id: &str,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Budget>> {
        let rows = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE cif_id = $1
              AND category = $2
              AND is_active = true
              AND start_date <= $4
              AND end_date >= $3
            "#
        ))
        .bind(cif_id)
        .bind(category)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Active budgets covering `today` with at least one alert toggle on
    pub async fn list_requiring_alert_check(&self, today: NaiveDate) -> Result<Vec<Budget>> {
        let rows = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            SELECT {BUDGET_COLUMNS} FROM budgets
            WHERE is_active = true
              AND $1 BETWEEN start_date AND end_date
              AND (alert_threshold_80 = true OR alert_threshold_100 = true)
            ORDER BY cif_id, category
            "#
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Distinct categories the customer has an active budget for
    pub async fn active_categories(&self, cif_id: &str) -> Result<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category FROM budgets
            WHERE cif_id = $1 AND is_active = true
            ORDER BY category
            "#,
        )
        .bind(cif_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

#[async_trait]
impl BudgetSource for BudgetRepository {
    async fn active_budgets_for_owner(&self, cif_id: &str) -> Result<Vec<Budget>> {
        self.list_active_by_owner(cif_id).await
    }

    async fn budgets_requiring_alert_check(&self, today: NaiveDate) -> Result<Vec<Budget>> {
        self.list_requiring_alert_check(today).await
    }
}

#[derive(sqlx::FromRow)]
struct BudgetRow {
    id: Uuid,
    cif_id: String,
    category: String,
    budget_amount: Decimal,
    period_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    is_active: bool,
    alert_threshold_80: bool,
    alert_threshold_100: bool,
    rollover_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BudgetRow> for Budget {
    fn from(row: BudgetRow) -> Self {
        let period_type = row.period_type.parse().unwrap_or_else(|_| {
            warn!(budget_id = %row.id, period_type = %row.period_type, "Unknown stored period type");
            PeriodType::default()
        });

        Budget {
            id: row.id,
            cif_id: row.cif_id,
            category: row.category,
            budget_amount: row.budget_amount,
            period_type,
            start_date: row.start_date,
            end_date: row.end_date,
            state: BudgetState::from_active(row.is_active),
            alert_threshold_80: row.alert_threshold_80,
            alert_threshold_100: row.alert_threshold_100,
            rollover_enabled: row.rollover_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_conversion() {
        let row = BudgetRow {
            id: Uuid::new_v4(),
            cif_id: "CIF001".to_string(),
            category: "Food".to_string(),
            budget_amount: dec!(10000.00),
            period_type: "WEEKLY".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            is_active: false,
            alert_threshold_80: true,
            alert_threshold_100: false,
            rollover_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let budget: Budget = row.into();

        assert_eq!(budget.period_type, PeriodType::Weekly);
        assert_eq!(budget.state, BudgetState::Inactive);
        assert!(!budget.alert_threshold_100);
    }

    #[test]
    fn test_unknown_period_falls_back_to_monthly() {
        let row = BudgetRow {
            id: Uuid::new_v4(),
            cif_id: "CIF001".to_string(),
            category: "Food".to_string(),
            budget_amount: dec!(100),
            period_type: "BIWEEKLY".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            is_active: true,
            alert_threshold_80: true,
            alert_threshold_100: true,
            rollover_enabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let budget: Budget = row.into();
        assert_eq!(budget.period_type, PeriodType::Monthly);
    }
}
