//! Transaction data models
//!
//! Transactions are read from the core banking `transactions` table; this
//! service only ever re-categorises them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest page size the API will serve
pub const MAX_PAGE_SIZE: u32 = 200;

/// Direction of a transaction leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl TransactionKind {
    /// Parse the `part_tran_type` column, case-insensitively
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("DEBIT") {
            Some(Self::Debit)
        } else if raw.eq_ignore_ascii_case("CREDIT") {
            Some(Self::Credit)
        } else {
            None
        }
    }
}

/// A customer transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Core banking transaction reference
    pub transaction_id: Option<String>,
    pub cif_id: String,
    pub transaction_date: Option<DateTime<Utc>>,
    pub posted_date: Option<DateTime<Utc>>,
    pub merchant: Option<String>,
    pub transaction_particular: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Categorisation confidence (0.0 to 1.0); 1.0 after a manual change
    pub confidence: Option<f64>,
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: u32, size: u32, total_elements: i64) -> Self {
        let size_i = i64::from(size.max(1));
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages: (total_elements + size_i - 1) / size_i,
        }
    }
}

fn default_page_size() -> u32 {
    20
}

/// Page/size query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
        }
    }
}

impl PageRequest {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.limit())
    }
}

/// Sort direction for filtered transaction listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn default_sort_by() -> String {
    "transaction_date".to_string()
}

/// Filter for transaction listings
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionFilter {
    pub cif_id: String,
    /// Restricts to debits in this category when present
    pub category: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

impl TransactionFilter {
    pub fn validate(&self) -> Result<()> {
        if self.cif_id.trim().is_empty() {
            return Err(Error::validation("Customer ID is required"));
        }
        if self.end_date < self.start_date {
            return Err(Error::validation("End date must not be before start date"));
        }
        self.order_by()?;
        Ok(())
    }

    pub fn paging(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            size: self.size,
        }
    }

    /// Category filter, ignoring blank values
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// `ORDER BY` clause from the whitelisted sort field
    pub fn order_by(&self) -> Result<String> {
        let column = match self.sort_by.as_str() {
            "transaction_date" | "transactionDate" => "tran_date",
            "amount" | "transactionAmount" => "tran_amt",
            "merchant" => "merchant",
            "category" => "category",
            other => {
                return Err(Error::validation(format!("Cannot sort by '{other}'")));
            }
        };
        Ok(format!("{column} {}", self.sort_direction.as_sql()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(sort_by: &str) -> TransactionFilter {
        TransactionFilter {
            cif_id: "CIF001".to_string(),
            category: Some("  ".to_string()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            page: 0,
            size: 20,
            sort_by: sort_by.to_string(),
            sort_direction: SortDirection::Desc,
        }
    }

    #[test]
    fn test_page_math() {
        let page: Page<i32> = Page::new(vec![], 0, 20, 41);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], 0, 20, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest { page: 2, size: 10_000 };
        assert_eq!(req.limit(), MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 400);
        assert_eq!(PageRequest { page: 0, size: 0 }.limit(), 1);
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(filter("amount").order_by().unwrap(), "tran_amt DESC");
        assert_eq!(filter("transactionDate").order_by().unwrap(), "tran_date DESC");
        assert!(filter("1; DROP TABLE transactions").validate().is_err());
    }

    #[test]
    fn test_blank_category_is_ignored() {
        assert_eq!(filter("amount").category(), None);
    }

    #[test]
    fn test_filter_deserializes_with_defaults() {
        let json = r#"{
            "cif_id": "CIF001",
            "start_date": "2024-01-01",
            "end_date": "2024-01-31",
            "sort_direction": "ASC"
        }"#;
        let parsed: TransactionFilter = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.paging().limit(), 20);
        assert_eq!(parsed.order_by().unwrap(), "tran_date ASC");
    }

    #[test]
    fn test_transaction_kind_parsing() {
        assert_eq!(TransactionKind::parse("debit"), Some(TransactionKind::Debit));
        assert_eq!(TransactionKind::parse("CREDIT"), Some(TransactionKind::Credit));
        assert_eq!(TransactionKind::parse("reversal"), None);
    }
}
