//! HTTP front end
//!
//! `POST /api/ask` runs one question through the agent, `GET /health` is a
//! liveness probe.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agent::{Agent, AgentResult, Source};
use crate::core::{Config, RagentError, Result};

const QUESTION_REQUIRED: &str = "Question is required";

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

/// Body returned when a question could not be processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: String,
    pub details: String,
    pub answer: String,
    pub sources: Option<Vec<Source>>,
    pub tool_used: Option<String>,
}

impl ErrorEnvelope {
    pub fn internal(details: impl Into<String>) -> Self {
        Self {
            error: "Failed to process the question.".to_string(),
            details: details.into(),
            answer: "An error occurred while processing your request.".to_string(),
            sources: None,
            tool_used: None,
        }
    }
}

/// Errors a handler can return
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(ErrorEnvelope),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Internal(envelope) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
            }
        }
    }
}

impl From<RagentError> for ApiError {
    fn from(err: RagentError) -> Self {
        match err {
            RagentError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(ErrorEnvelope::internal(other.to_string())),
        }
    }
}

/// Build the router around a ready agent
pub fn routes(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/api/ask", post(ask))
        .route("/health", get(health))
        .with_state(AppState { agent })
}

async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> std::result::Result<Json<AgentResult>, ApiError> {
    let question = match payload {
        Ok(Json(req)) => req.question.unwrap_or_default(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable ask body");
            String::new()
        }
    };

    if question.trim().is_empty() {
        return Err(ApiError::BadRequest(QUESTION_REQUIRED.to_string()));
    }

    match state.agent.ask(&question).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            tracing::error!(error = %e, "failed to answer question");
            Err(e.into())
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Serve until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let addr = config.server_addr();
    let agent = Arc::new(Agent::from_config(config)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RagentError::with_context(format!("failed to bind {}", addr), e))?;

    tracing::info!(addr = %addr, "server listening");
    println!("Server listening on http://{} (ask: POST /api/ask, health: GET /health)", addr);

    axum::serve(listener, routes(agent))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
    }
}
