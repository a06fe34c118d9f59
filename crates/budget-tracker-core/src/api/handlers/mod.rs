//! API handlers for the HTTP REST API

pub mod alerts;
pub mod analytics;
pub mod budgets;
pub mod categories;
pub mod transactions;

use std::sync::Arc;

use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::alerting::{AlertRepository, ThresholdEvaluator};
use crate::clock::Clock;
use crate::config::AlertingConfig;
use crate::db::Database;
use crate::service::{AnalyticsService, BudgetService, CategoryService, TransactionService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub budgets: BudgetService,
    pub transactions: TransactionService,
    pub categories: CategoryService,
    pub analytics: AnalyticsService,
    pub alerts: AlertRepository,
    pub evaluator: Arc<ThresholdEvaluator>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire services and the threshold evaluator over one database
    pub fn new(db: &Database, alerting: &AlertingConfig, clock: Arc<dyn Clock>) -> Self {
        let evaluator = Arc::new(
            ThresholdEvaluator::new(
                Arc::new(db.budgets.clone()),
                Arc::new(db.transactions.clone()),
                Arc::new(db.alerts.clone()),
                clock.clone(),
            )
            .with_dedup_window(alerting.dedup_window)
            .with_channels(alerting.default_channels.clone()),
        );

        Self {
            budgets: BudgetService::new(
                db.budgets.clone(),
                db.transactions.clone(),
                evaluator.clone(),
                clock.clone(),
            ),
            transactions: TransactionService::new(db.transactions.clone(), clock.clone()),
            categories: CategoryService::new(
                db.transactions.clone(),
                db.budgets.clone(),
                clock.clone(),
            ),
            analytics: AnalyticsService::new(db.transactions.clone(), clock.clone()),
            alerts: db.alerts.clone(),
            evaluator,
            clock,
        }
    }
}

/// Success envelope for every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data,
        })
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Inclusive `start_date` / `end_date` query parameters
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Optional lookback in months
#[derive(Debug, Deserialize)]
pub struct MonthsQuery {
    pub months: Option<u32>,
}
