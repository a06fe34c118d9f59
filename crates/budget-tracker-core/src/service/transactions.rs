use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::TransactionRepository;
use crate::error::{Error, Result};
use crate::models::{day_bounds, Page, PageRequest, Transaction, TransactionFilter};

#[derive(Clone)]
pub struct TransactionService {
    transactions: TransactionRepository,
    clock: Arc<dyn Clock>,
}

impl TransactionService {
    pub fn new(transactions: TransactionRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions,
            clock,
        }
    }

    pub async fn list_for_owner(&self, cif_id: &str, paging: PageRequest) -> Result<Page<Transaction>> {
        debug!(cif_id, page = paging.page, size = paging.limit(), "Fetching transactions");
        self.transactions.page_by_owner(cif_id, paging).await
    }

    pub async fn filter(&self, filter: &TransactionFilter) -> Result<Page<Transaction>> {
        filter.validate()?;
        debug!(cif_id = %filter.cif_id, category = ?filter.category(), "Filtering transactions");
        self.transactions.filter(filter).await
    }

    /// Uncategorised transactions from the last `months` months
    pub async fn uncategorized(&self, cif_id: &str, months: u32) -> Result<Vec<Transaction>> {
        let since = months_ago(self.clock.now(), months);
        self.transactions.uncategorized(cif_id, since).await
    }

    /// Debit spending in one category over an inclusive date range
    pub async fn category_spending(
        &self,
        cif_id: &str,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        if end < start {
            return Err(Error::validation("End date must not be before start date"));
        }
        let (from, to) = day_bounds(start, end);
        self.transactions
            .category_spending(cif_id, category, from, to)
            .await
    }

    /// Manually assign a category
    pub async fn recategorize(&self, id: i64, category: &str) -> Result<Transaction> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::validation("Category is required"));
        }

        let updated = self
            .transactions
            .recategorize(id, category, self.clock.now())
            .await?
            .ok_or_else(|| Error::not_found("Transaction", id))?;

        info!(transaction_id = id, category, "Transaction re-categorised");
        Ok(updated)
    }

    pub async fn get(&self, id: i64) -> Result<Transaction> {
        self.transactions
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("Transaction", id))
    }
}

/// `now` moved back by whole calendar months, saturating at the minimum instant
pub(crate) fn months_ago(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_months_ago_clamps_month_end() {
        let now = DateTime::parse_from_rfc3339("2024-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let since = months_ago(now, 1);
        assert_eq!(since.to_rfc3339(), "2024-02-29T12:00:00+00:00");
        assert_eq!(months_ago(now, 0), now);
    }
}
