use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::alerting::SweepReport;
use crate::error::Result;
use crate::models::{BudgetInput, BudgetResponse, BudgetSummary, BudgetUpdate};

use super::{ApiResponse, AppState, DateRangeQuery};

pub async fn create_budget(
    State(state): State<AppState>,
    Json(input): Json<BudgetInput>,
) -> Result<(StatusCode, Json<ApiResponse<BudgetResponse>>)> {
    let budget = state.budgets.create_budget(input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Budget created successfully", budget),
    ))
}

pub async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BudgetResponse>>> {
    let budget = state.budgets.get_budget(id).await?;
    Ok(ApiResponse::ok(budget))
}

pub async fn update_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<BudgetUpdate>,
) -> Result<Json<ApiResponse<BudgetResponse>>> {
    let budget = state.budgets.update_budget(id, update).await?;
    Ok(ApiResponse::with_message("Budget updated successfully", budget))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.budgets.delete_budget(id).await?;
    Ok(ApiResponse::with_message("Budget deleted successfully", ()))
}

pub async fn list_active_budgets(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<BudgetResponse>>>> {
    let budgets = state.budgets.list_active_budgets(&cif_id).await?;
    Ok(ApiResponse::ok(budgets))
}

pub async fn budget_summary(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<BudgetSummary>>> {
    let summary = state
        .budgets
        .budget_summary(&cif_id, range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok(summary))
}

pub async fn check_alerts(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
) -> Result<Json<ApiResponse<SweepReport>>> {
    let report = state.budgets.check_alerts(&cif_id).await?;
    Ok(ApiResponse::with_message("Alert check completed", report))
}
