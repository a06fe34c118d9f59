use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::models::CategoryStats;

use super::{ApiResponse, AppState};

pub async fn all_categories(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    let categories = state.categories.all_categories().await?;
    Ok(ApiResponse::ok(categories))
}

pub async fn customer_categories(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CategoryStats>>>> {
    let stats = state.categories.category_stats(&cif_id).await?;
    Ok(ApiResponse::ok(stats))
}

pub async fn available_categories(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>> {
    let categories = state.categories.available_categories(&cif_id).await?;
    Ok(ApiResponse::ok(categories))
}
