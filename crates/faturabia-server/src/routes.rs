use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use faturabia::models::{Id, InvoiceStatistics};
use faturabia::stats::{CustomerInvoices, DashboardData, SyncStatusReport};
use faturabia::sync::FetchAllSummary;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity set by the authentication layer in front of this server.
#[derive(Debug, Clone)]
pub struct UserId(pub Id);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {USER_ID_HEADER} header")))?;
        let id = Id::from_string_checked(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(UserId(id))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/invoices/fetch-all", post(fetch_all))
        .route("/invoices/statistics", get(statistics))
        .route("/dashboard/data", get(dashboard))
        .route("/reports/data", get(dashboard))
        .route("/dashboard/api-status", get(api_status))
        .route("/customers/{id}/invoices", get(customer_invoices))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "pendingJobs": state.jobs().pending(),
    }))
}

async fn fetch_all(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<FetchAllSummary>, ApiError> {
    Ok(Json(state.sync.fetch_all(&user_id).await?))
}

async fn statistics(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<InvoiceStatistics>, ApiError> {
    Ok(Json(state.reports.statistics(&user_id).await?))
}

async fn dashboard(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<DashboardData>, ApiError> {
    Ok(Json(state.reports.dashboard(&user_id).await?))
}

async fn api_status(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<SyncStatusReport>, ApiError> {
    Ok(Json(state.reports.status(&user_id).await?))
}

async fn customer_invoices(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerInvoices>, ApiError> {
    let customer_id =
        Id::from_string_checked(customer_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(
        state
            .reports
            .customer_invoices(&user_id, &customer_id)
            .await?,
    ))
}
