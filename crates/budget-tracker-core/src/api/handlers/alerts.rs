use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::BudgetAlert;

use super::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct MarkSentRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MarkSentResponse {
    pub updated: u64,
}

pub async fn list_customer_alerts(
    State(state): State<AppState>,
    Path(cif_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<BudgetAlert>>>> {
    let alerts = state.alerts.list_for_owner(&cif_id).await?;
    Ok(ApiResponse::ok(alerts))
}

pub async fn list_unsent_alerts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BudgetAlert>>>> {
    let alerts = state.alerts.list_unsent().await?;
    Ok(ApiResponse::ok(alerts))
}

/// Record delivery of one alert
pub async fn mark_alert_sent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BudgetAlert>>> {
    let alert = state
        .alerts
        .mark_sent(id, state.clock.now())
        .await?
        .ok_or_else(|| Error::not_found("Alert", id))?;
    Ok(ApiResponse::ok(alert))
}

/// Record delivery of several alerts; already-sent ones are left untouched
pub async fn mark_alerts_sent(
    State(state): State<AppState>,
    Json(req): Json<MarkSentRequest>,
) -> Result<Json<ApiResponse<MarkSentResponse>>> {
    let updated = state
        .alerts
        .mark_many_sent(&req.ids, state.clock.now())
        .await?;
    Ok(ApiResponse::ok(MarkSentResponse { updated }))
}
