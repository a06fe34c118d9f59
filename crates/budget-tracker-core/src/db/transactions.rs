//! Transaction queries and spending aggregates

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::alerting::SpendingSource;
use crate::error::Result;
use crate::models::{
    CategorySpending, MonthlyTrend, Page, PageRequest, Transaction, TransactionFilter,
    TransactionKind,
};

const TRANSACTION_COLUMNS: &str = r#"
    id, tran_id, cif_id, tran_date, pstd_date, merchant, tran_particular,
    tran_amt, part_tran_type, category, subcategory, confidence
"#;

/// Repository for customer transactions
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Customer transactions, newest first
    pub async fn page_by_owner(&self, cif_id: &str, paging: PageRequest) -> Result<Page<Transaction>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE cif_id = $1")
            .bind(cif_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE cif_id = $1
            ORDER BY tran_date DESC NULLS LAST
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(cif_id)
        .bind(i64::from(paging.limit()))
        .bind(paging.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(|r| r.into()).collect(),
            paging.page,
            paging.limit(),
            total,
        ))
    }

    /// Filtered, sorted and paged transactions. A category restricts the
    /// result to debits.
    pub async fn filter(&self, filter: &TransactionFilter) -> Result<Page<Transaction>> {
        let order_by = filter.order_by()?;
        let paging = filter.paging();
        let (start, end) = crate::models::day_bounds(filter.start_date, filter.end_date);

        let mut conditions = vec![
            "cif_id = $1".to_string(),
            "tran_date BETWEEN $2 AND $3".to_string(),
        ];
        if filter.category().is_some() {
            conditions.push("category = $4".to_string());
            conditions.push("part_tran_type = 'DEBIT'".to_string());
        }
        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM transactions WHERE {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(&filter.cif_id)
            .bind(start)
            .bind(end);
        if let Some(category) = filter.category() {
            count_query = count_query.bind(category);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let limit = paging.limit();
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE {where_clause}
            ORDER BY {order_by}
            LIMIT {limit} OFFSET {}
            "#,
            paging.offset()
        );
        let mut query = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(&filter.cif_id)
            .bind(start)
            .bind(end);
        if let Some(category) = filter.category() {
            query = query.bind(category);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(|r| r.into()).collect(),
            paging.page,
            limit,
            total,
        ))
    }

    /// Transactions without a category since `since`, newest first
    pub async fn uncategorized(&self, cif_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE cif_id = $1
              AND (category IS NULL OR category = '')
              AND tran_date >= $2
            ORDER BY tran_date DESC
            "#
        ))
        .bind(cif_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Get a transaction by ID
    pub async fn get(&self, id: i64) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    /// Set a manual category; confidence becomes 1.0
    pub async fn recategorize(
        &self,
        id: i64,
        category: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET category = $2, confidence = 1.0, processed_at = $3
            WHERE id = $1
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(category)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    /// Non-blank categories used in the customer's transactions
    pub async fn categories_for_owner(&self, cif_id: &str) -> Result<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category FROM transactions
            WHERE cif_id = $1 AND category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .bind(cif_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Non-blank categories across all transactions
    pub async fn all_categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category FROM transactions
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Sum of absolute debit amounts in one category
    pub async fn category_spending(
        &self,
        cif_id: &str,
        category: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ABS(tran_amt)), 0) FROM transactions
            WHERE cif_id = $1
              AND category = $2
              AND part_tran_type = 'DEBIT'
              AND tran_date BETWEEN $3 AND $4
            "#,
        )
        .bind(cif_id)
        .bind(category)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or_default())
    }

    /// Sum of credit amounts
    pub async fn total_income(
        &self,
        cif_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(tran_amt), 0) FROM transactions
            WHERE cif_id = $1
              AND part_tran_type = 'CREDIT'
              AND tran_date BETWEEN $2 AND $3
            "#,
        )
        .bind(cif_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or_default())
    }

    /// Sum of absolute debit amounts
    pub async fn total_expenses(
        &self,
        cif_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ABS(tran_amt)), 0) FROM transactions
            WHERE cif_id = $1
              AND part_tran_type = 'DEBIT'
              AND tran_date BETWEEN $2 AND $3
            "#,
        )
        .bind(cif_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or_default())
    }

    /// Debit totals per category, largest first
    pub async fn spending_by_category(
        &self,
        cif_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategorySpending>> {
        let rows = sqlx::query_as::<_, CategorySpendingRow>(
            r#"
            SELECT category,
                   COALESCE(SUM(ABS(tran_amt)), 0) AS total_amount,
                   COUNT(*) AS transaction_count
            FROM transactions
            WHERE cif_id = $1
              AND part_tran_type = 'DEBIT'
              AND tran_date BETWEEN $2 AND $3
            GROUP BY category
            ORDER BY total_amount DESC
            "#,
        )
        .bind(cif_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Merchants with the most debit spending
    pub async fn top_merchants(
        &self,
        cif_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<String>> {
        let merchants: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT merchant FROM transactions
            WHERE cif_id = $1
              AND part_tran_type = 'DEBIT'
              AND merchant IS NOT NULL
              AND tran_date BETWEEN $2 AND $3
            GROUP BY merchant
            ORDER BY SUM(ABS(tran_amt)) DESC
            LIMIT $4
            "#,
        )
        .bind(cif_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(merchants)
    }

    /// Income and expenses per calendar month since `since`, latest month first
    pub async fn monthly_trend(&self, cif_id: &str, since: DateTime<Utc>) -> Result<Vec<MonthlyTrend>> {
        let rows = sqlx::query_as::<_, MonthlyTrendRow>(
            r#"
            SELECT DATE_TRUNC('month', tran_date)::date AS month,
                   COALESCE(SUM(CASE WHEN part_tran_type = 'CREDIT' THEN tran_amt ELSE 0 END), 0) AS income,
                   COALESCE(SUM(CASE WHEN part_tran_type = 'DEBIT' THEN ABS(tran_amt) ELSE 0 END), 0) AS expenses
            FROM transactions
            WHERE cif_id = $1 AND tran_date >= $2
            GROUP BY DATE_TRUNC('month', tran_date)
            ORDER BY month DESC
            "#,
        )
        .bind(cif_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

#[async_trait]
impl SpendingSource for TransactionRepository {
    async fn category_spending(
        &self,
        cif_id: &str,
        category: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Decimal>> {
        TransactionRepository::category_spending(self, cif_id, category, start, end)
            .await
            .map(Some)
    }
}

// Row types for database mapping

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    tran_id: Option<String>,
    cif_id: String,
    tran_date: Option<DateTime<Utc>>,
    pstd_date: Option<DateTime<Utc>>,
    merchant: Option<String>,
    tran_particular: Option<String>,
    tran_amt: Option<Decimal>,
    part_tran_type: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    confidence: Option<f64>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Transaction {
            id: row.id,
            transaction_id: row.tran_id,
            cif_id: row.cif_id,
            transaction_date: row.tran_date,
            posted_date: row.pstd_date,
            merchant: row.merchant,
            transaction_particular: row.tran_particular,
            amount: row.tran_amt,
            kind: row.part_tran_type.as_deref().and_then(TransactionKind::parse),
            category: row.category,
            subcategory: row.subcategory,
            confidence: row.confidence,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategorySpendingRow {
    category: Option<String>,
    total_amount: Decimal,
    transaction_count: i64,
}

impl From<CategorySpendingRow> for CategorySpending {
    fn from(row: CategorySpendingRow) -> Self {
        CategorySpending {
            category: row
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Uncategorized".to_string()),
            total_amount: row.total_amount,
            transaction_count: row.transaction_count,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MonthlyTrendRow {
    month: NaiveDate,
    income: Decimal,
    expenses: Decimal,
}

impl From<MonthlyTrendRow> for MonthlyTrend {
    fn from(row: MonthlyTrendRow) -> Self {
        MonthlyTrend {
            month: row.month,
            income: row.income,
            expenses: row.expenses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_kind_parsing() {
        let row = TransactionRow {
            id: 7,
            tran_id: Some("TX-7".to_string()),
            cif_id: "CIF001".to_string(),
            tran_date: Some(Utc::now()),
            pstd_date: None,
            merchant: Some("Naivas".to_string()),
            tran_particular: None,
            tran_amt: Some(dec!(-1200.00)),
            part_tran_type: Some("DEBIT".to_string()),
            category: Some("Food".to_string()),
            subcategory: None,
            confidence: Some(0.92),
        };

        let tx: Transaction = row.into();

        assert_eq!(tx.kind, Some(TransactionKind::Debit));
        assert_eq!(tx.amount, Some(dec!(-1200.00)));
    }

    #[test]
    fn test_null_category_is_labelled() {
        let row = CategorySpendingRow {
            category: None,
            total_amount: dec!(50),
            transaction_count: 2,
        };
        let spending: CategorySpending = row.into();
        assert_eq!(spending.category, "Uncategorized");
    }
}
