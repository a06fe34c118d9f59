//! Alert repository for storing and querying budget alerts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{AlertType, BudgetAlert, DeliveryState, NotificationChannel};

use super::AlertStore;

const ALERT_COLUMNS: &str = r#"
    id, budget_id, cif_id, alert_type, current_spending, budget_limit,
    percentage_used, category, alert_message, is_sent, sent_at,
    notification_channels, created_at
"#;

/// Repository for budget alerts
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Create a new alert repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new alert
    pub async fn insert(&self, alert: &BudgetAlert) -> Result<BudgetAlert> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            INSERT INTO budget_alerts (
                id, budget_id, cif_id, alert_type, current_spending, budget_limit,
                percentage_used, category, alert_message, is_sent, sent_at,
                notification_channels, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(alert.id)
        .bind(alert.budget_id)
        .bind(&alert.cif_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.current_spending)
        .bind(alert.budget_limit)
        .bind(i32::try_from(alert.percentage_used).unwrap_or(i32::MAX))
        .bind(&alert.category)
        .bind(&alert.message)
        .bind(alert.delivery.is_sent())
        .bind(alert.delivery.sent_at())
        .bind(NotificationChannel::join(&alert.channels))
        .bind(alert.created_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Whether an alert of `alert_type` for the budget was marked sent at or after `since`
    pub async fn has_alert_been_sent(
        &self,
        budget_id: Uuid,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM budget_alerts
                WHERE budget_id = $1
                  AND alert_type = $2
                  AND is_sent = true
                  AND sent_at >= $3
            )
            "#,
        )
        .bind(budget_id)
        .bind(alert_type.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// All alerts for a customer, newest first
    pub async fn list_for_owner(&self, cif_id: &str) -> Result<Vec<BudgetAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {ALERT_COLUMNS} FROM budget_alerts
            WHERE cif_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(cif_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(readable_alerts(rows))
    }

    /// Alerts not yet handed to delivery, newest first
    pub async fn list_unsent(&self) -> Result<Vec<BudgetAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {ALERT_COLUMNS} FROM budget_alerts
            WHERE is_sent = false
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(readable_alerts(rows))
    }

    /// Mark one alert sent. Already-sent alerts keep their original timestamp.
    pub async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<BudgetAlert>> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            UPDATE budget_alerts
            SET sent_at = CASE WHEN is_sent THEN sent_at ELSE $2 END,
                is_sent = true
            WHERE id = $1
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BudgetAlert::try_from).transpose()
    }

    /// Mark every unsent alert in `ids` sent; returns how many changed
    pub async fn mark_many_sent(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE budget_alerts
            SET is_sent = true, sent_at = $2
            WHERE id = ANY($1) AND is_sent = false
            "#,
        )
        .bind(ids)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete alerts created before `before`; returns how many were removed
    pub async fn delete_older_than(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM budget_alerts WHERE created_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    async fn has_alert_been_sent(
        &self,
        budget_id: Uuid,
        alert_type: AlertType,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        AlertRepository::has_alert_been_sent(self, budget_id, alert_type, since).await
    }

    async fn insert_alert(&self, alert: &BudgetAlert) -> Result<BudgetAlert> {
        self.insert(alert).await
    }
}

/// Converts rows, skipping any whose alert type is not recognised
fn readable_alerts(rows: Vec<AlertRow>) -> Vec<BudgetAlert> {
    rows.into_iter()
        .filter_map(|row| match BudgetAlert::try_from(row) {
            Ok(alert) => Some(alert),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable budget alert");
                None
            }
        })
        .collect()
}

// Row type for database mapping

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    budget_id: Uuid,
    cif_id: String,
    alert_type: String,
    current_spending: Option<Decimal>,
    budget_limit: Option<Decimal>,
    percentage_used: Option<i32>,
    category: Option<String>,
    alert_message: Option<String>,
    is_sent: bool,
    sent_at: Option<DateTime<Utc>>,
    notification_channels: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for BudgetAlert {
    type Error = Error;

    fn try_from(row: AlertRow) -> Result<Self> {
        let alert_type: AlertType = row.alert_type.parse().map_err(|_| {
            Error::internal(format!(
                "Unknown alert type '{}' on alert {}",
                row.alert_type, row.id
            ))
        })?;

        Ok(BudgetAlert {
            id: row.id,
            budget_id: row.budget_id,
            cif_id: row.cif_id,
            alert_type,
            current_spending: row.current_spending.unwrap_or_default(),
            budget_limit: row.budget_limit.unwrap_or_default(),
            percentage_used: row
                .percentage_used
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(0),
            category: row.category.unwrap_or_default(),
            message: row.alert_message.unwrap_or_default(),
            delivery: DeliveryState::from_columns(row.is_sent, row.sent_at),
            channels: row
                .notification_channels
                .as_deref()
                .map(NotificationChannel::parse_list)
                .unwrap_or_default(),
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn row() -> AlertRow {
        AlertRow {
            id: Uuid::new_v4(),
            budget_id: Uuid::new_v4(),
            cif_id: "CIF001".to_string(),
            alert_type: "EXCEEDED".to_string(),
            current_spending: Some(dec!(12000)),
            budget_limit: Some(dec!(10000)),
            percentage_used: Some(120),
            category: Some("Food".to_string()),
            alert_message: Some("over".to_string()),
            is_sent: false,
            sent_at: None,
            notification_channels: Some("SMS,EMAIL,PUSH".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let alert = BudgetAlert::try_from(row()).unwrap();

        assert_eq!(alert.alert_type, AlertType::Exceeded);
        assert_eq!(alert.percentage_used, 120);
        assert_eq!(alert.delivery, DeliveryState::Unsent);
        assert_eq!(alert.channels, NotificationChannel::defaults());
    }

    #[test]
    fn test_row_conversion_tolerates_nulls() {
        let mut sparse = row();
        sparse.current_spending = None;
        sparse.percentage_used = Some(-5);
        sparse.notification_channels = None;
        sparse.is_sent = true;
        sparse.sent_at = Some(Utc::now());

        let alert = BudgetAlert::try_from(sparse).unwrap();

        assert_eq!(alert.current_spending, Decimal::ZERO);
        assert_eq!(alert.percentage_used, 0);
        assert!(alert.channels.is_empty());
        assert!(alert.delivery.is_sent());
    }

    #[test]
    fn test_unknown_alert_type_is_not_relabelled() {
        let mut unknown = row();
        unknown.alert_type = "THRESHOLD_50".to_string();

        let err = BudgetAlert::try_from(unknown).unwrap_err();
        assert!(err.to_string().contains("Unknown alert type 'THRESHOLD_50'"));
    }

    #[test]
    fn test_listing_skips_unreadable_rows() {
        let mut unknown = row();
        unknown.alert_type = "LEGACY".to_string();
        let known = row();
        let known_id = known.id;

        let alerts = readable_alerts(vec![unknown, known]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, known_id);
        assert_eq!(alerts[0].alert_type, AlertType::Exceeded);
    }
}
