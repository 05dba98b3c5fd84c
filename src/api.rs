//! REST API for the fraud investigation agent
//!
//! Accepts alerts over HTTP, runs the investigation loop per request, and
//! serves completed briefs back out of the archive.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::audit::BriefArchive;
use crate::error::AgentError;
use crate::investigation::InvestigationLoop;
use crate::models::Alert;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InvestigationRequest {
    pub transaction_id: String,
    pub description: String,
    pub initial_risk_score: f64,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub investigator: Arc<InvestigationLoop>,
    pub archive: Arc<BriefArchive>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Investigation Endpoints
/// =============================

async fn run_investigation(
    State(state): State<ApiState>,
    Json(req): Json<InvestigationRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(
        transaction_id = %req.transaction_id,
        risk = req.initial_risk_score,
        "Received investigation request"
    );

    if !(0.0..=1.0).contains(&req.initial_risk_score) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "initial_risk_score must lie in [0,1], got {}",
                req.initial_risk_score
            ))),
        );
    }

    let alert = Alert::new(req.transaction_id, req.description, req.initial_risk_score);

    match state.investigator.run(alert).await {
        Ok(brief) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "brief_id": brief.brief_id,
                "transaction_id": brief.alert.transaction_id,
                "recommendation": brief.recommendation,
                "confidence": brief.confidence,
                "summary": brief.summary,
                "tool_call_count": brief.tool_call_count,
                "budget_exhausted": brief.budget_exhausted,
                "duration_ms": brief.duration_ms,
            }))),
        ),
        Err(e) => {
            let status = match &e {
                AgentError::InvalidArguments(_) | AgentError::InvalidConfidence(_) => {
                    StatusCode::BAD_REQUEST
                }
                AgentError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                AgentError::DriverUnavailable(_) | AgentError::TransientApiError(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ApiResponse::error(format!("Investigation failed: {}", e))),
            )
        }
    }
}

async fn get_brief(
    State(state): State<ApiState>,
    Path(brief_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.archive.get(brief_id).await {
        Some(brief) => (StatusCode::OK, Json(ApiResponse::success(brief))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No brief with id {}", brief_id))),
        ),
    }
}

async fn list_briefs_for_transaction(
    State(state): State<ApiState>,
    Path(transaction_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let ids = state.archive.list_for_transaction(&transaction_id).await;
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "transaction_id": transaction_id,
            "brief_ids": ids,
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(investigator: Arc<InvestigationLoop>, archive: Arc<BriefArchive>) -> Router {
    let state = ApiState {
        investigator,
        archive,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/investigations", post(run_investigation))
        .route("/api/investigations/:brief_id", get(get_brief))
        .route(
            "/api/transactions/:transaction_id/briefs",
            get(list_briefs_for_transaction),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    investigator: Arc<InvestigationLoop>,
    archive: Arc<BriefArchive>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(investigator, archive);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
