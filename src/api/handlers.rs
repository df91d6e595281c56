//! HTTP request handlers
//!
//! Single translation point from gate error kinds to HTTP status codes.
//! BLOCK is a successful evaluation and maps to 403, not to an error body.

use super::types::{ErrorResponse, EvaluateRequest, HealthResponse, ToolsResponse};
use super::AppState;
use crate::gate::{GateError, GateResult, SessionStatus};
use crate::policy::Verdict;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/evaluate", post(evaluate))
        .route("/session/:id", get(session_status))
        .route("/tools", get(list_tools))
        .route("/health", get(health))
        .route("/version", get(version))
        .with_state(state)
}

// ============================================================
// POST /evaluate
// ============================================================

async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Response, AppError> {
    let result: GateResult = state
        .gate
        .evaluate_call(&req.session_id, &req.tool_name)
        .await?;

    let status = match result.decision {
        Verdict::Allow => StatusCode::OK,
        Verdict::Block => StatusCode::FORBIDDEN,
    };

    Ok((status, Json(result)).into_response())
}

// ============================================================
// GET /session/:id
// ============================================================

async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatus>, AppError> {
    let status = state.gate.session_status(&id).await?;
    Ok(Json(status))
}

// ============================================================
// GET /tools
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.gate.list_tools(),
    })
}

// ============================================================
// Health / Version
// ============================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn version() -> &'static str {
    concat!("trifecta-gate ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

struct AppError(GateError);

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GateError::UnknownTool(_) => StatusCode::NOT_FOUND,
            // Both retryable: the caller may safely repeat the request.
            GateError::Store(_) | GateError::Conflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(ErrorResponse::new(self.0.to_string()));
        (status, body).into_response()
    }
}
