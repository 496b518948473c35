//! HTTP request handlers.

use super::AppState;
use crate::models::{CheckOutcome, Iteration};
use crate::reconcile::{ReconcileError, ReconcileOptions, UnitReport};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tokio::time::timeout;

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

pub async fn handle_health() -> impl IntoResponse {
    "ok"
}

// ============================================================================
// Ingest
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IterationRequest {
    #[serde(default)]
    pub ordinal: i64,
    pub results: Vec<CheckOutcome>,
    #[serde(default)]
    pub options: ReconcileOptions,
}

pub async fn handle_reconcile_iteration(
    State(state): State<AppState>,
    Json(req): Json<IterationRequest>,
) -> Response {
    let iteration = Iteration {
        ordinal: req.ordinal,
        results: req.results,
    };

    match state
        .reconciler
        .reconcile_iteration(&iteration, req.options, state.config.batch_deadline)
        .await
    {
        Ok(report) if report.is_success() => Json(report).into_response(),
        Ok(report) => (StatusCode::MULTI_STATUS, Json(report)).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

pub async fn handle_reconcile_result(
    State(state): State<AppState>,
    Query(options): Query<ReconcileOptions>,
    Json(outcome): Json<CheckOutcome>,
) -> Response {
    let name = outcome.name.clone();
    let unit = state.reconciler.reconcile_check_result(&outcome, &options);
    let result = match state.config.batch_deadline {
        Some(deadline) => timeout(deadline, unit)
            .await
            .unwrap_or(Err(ReconcileError::DeadlineExceeded)),
        None => unit.await,
    };

    match result {
        Ok(unit) => Json(UnitReport::completed(name, unit)).into_response(),
        Err(e @ ReconcileError::Validation(_)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e @ ReconcileError::DeadlineExceeded) => {
            tracing::warn!("Gave up reconciling {}: {}", name, e);
            error_response(StatusCode::GATEWAY_TIMEOUT, e)
        }
        Err(e) => {
            tracing::error!("Failed to reconcile {}: {}", name, e);
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

// ============================================================================
// Administration
// ============================================================================

pub async fn handle_get_component(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.reconciler.client().get_component(id).await {
        Ok(Some(component)) => Json(component).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("component {} not found", id)),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

pub async fn handle_delete_component(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let result = state.reconciler.client().delete_component(id).await;
    deleted("component", id, result)
}

pub async fn handle_delete_incident(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let result = state.reconciler.client().delete_incident(id).await;
    deleted("incident", id, result)
}

fn deleted(kind: &str, id: i64, result: Result<bool, crate::client::ClientError>) -> Response {
    match result {
        Ok(true) => {
            tracing::info!("Deleted {} {}", kind, id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => error_response(
            StatusCode::BAD_GATEWAY,
            format!("status page did not confirm deleting {} {}", kind, id),
        ),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}
