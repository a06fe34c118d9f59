use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::Result;
use crate::models::{CategorySpending, MonthlyTrend, SpendingAnalytics, SpendingInsight};

use super::{ApiResponse, AppState, DateRangeQuery, MonthsQuery};

const DEFAULT_TREND_MONTHS: u32 = 6;

pub async fn spending_analytics(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<SpendingAnalytics>>> {
    let analytics = state
        .analytics
        .spending_analytics(&cif_id, range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok(analytics))
}

pub async fn category_breakdown(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<Vec<CategorySpending>>>> {
    let breakdown = state
        .analytics
        .category_breakdown(&cif_id, range.start_date, range.end_date)
        .await?;
    Ok(ApiResponse::ok(breakdown))
}

pub async fn monthly_trend(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
    Query(query): Query<MonthsQuery>,
) -> Result<Json<ApiResponse<Vec<MonthlyTrend>>>> {
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);
    let trend = state.analytics.monthly_trend(&cif_id, months).await?;
    Ok(ApiResponse::ok(trend))
}

pub async fn insights(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<SpendingInsight>>>> {
    let insights = state.analytics.insights(&cif_id).await?;
    Ok(ApiResponse::ok(insights))
}
