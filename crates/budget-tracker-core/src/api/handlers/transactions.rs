use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Page, PageRequest, Transaction, TransactionFilter};

use super::{ApiResponse, AppState, DateRangeQuery, MonthsQuery};

const DEFAULT_UNCATEGORIZED_MONTHS: u32 = 3;

#[derive(Debug, Deserialize)]
pub struct RecategorizeQuery {
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct CategorySpendingResponse {
    pub cif_id: String,
    pub category: String,
    pub total_spending: Decimal,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
    Query(paging): Query<PageRequest>,
) -> Result<Json<ApiResponse<Page<Transaction>>>> {
    let page = state.transactions.list_for_owner(&cif_id, paging).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn filter_transactions(
    State(state): State<AppState>,
    Json(filter): Json<TransactionFilter>,
) -> Result<Json<ApiResponse<Page<Transaction>>>> {
    let page = state.transactions.filter(&filter).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn uncategorized_transactions(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
    Query(query): Query<MonthsQuery>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>> {
    let months = query.months.unwrap_or(DEFAULT_UNCATEGORIZED_MONTHS);
    let transactions = state.transactions.uncategorized(&cif_id, months).await?;
    Ok(ApiResponse::ok(transactions))
}

pub async fn category_spending(
    State(state): State<AppState>,
    Path((cif_id, category)): Path<(String, String)>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<CategorySpendingResponse>>> {
    let total_spending = state
        .transactions
        .category_spending(&cif_id, &category, range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok(CategorySpendingResponse {
        cif_id,
        category,
        total_spending,
    }))
}

pub async fn recategorize_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<RecategorizeQuery>,
) -> Result<Json<ApiResponse<Transaction>>> {
    let transaction = state.transactions.recategorize(id, &query.category).await?;
    Ok(ApiResponse::with_message("Transaction re-categorised", transaction))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Transaction>>> {
    let transaction = state.transactions.get(id).await?;
    Ok(ApiResponse::ok(transaction))
}
