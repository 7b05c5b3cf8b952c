//! HTTP boundary
//!
//! Routes:
//! - `GET /` service descriptor
//! - `GET /api/sessions` session listing
//! - `POST /api/send-message` append a user message to a session
//! - `GET /api/conversation/{session_id}` decoded records of a session
//!
//! Failures are always `{"error": "..."}` bodies: 400 for bad input, 500 for
//! everything else.

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ccproxy_core::{Notifier, SessionStore};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

const SERVICE_NAME: &str = "Claude API Proxy";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub notifier: Arc<Notifier>,
    /// Port advertised in the service descriptor
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    session_id: Option<String>,
    message: Option<String>,
    project_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationQuery {
    project_path: Option<String>,
}

/// JSON error response.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ccproxy_core::Error> for ApiError {
    fn from(error: ccproxy_core::Error) -> Self {
        if error.is_caller_error() {
            Self::bad_request(error.to_string())
        } else {
            Self::internal(error.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker task failed: {error}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/sessions", get(sessions))
        .route("/api/send-message", post(send_message))
        .route("/api/conversation/{session_id}", get(conversation))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Permissive CORS for browser dashboards; preflights succeed immediately.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(
            "Origin, X-Requested-With, Content-Type, Accept, Authorization",
        ),
    );
    response
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "port": state.port,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Proxy service for bidirectional communication with Claude Code",
        "endpoints": {
            "/": "This status page",
            "/api/sessions": "Get active Claude Code sessions",
            "/api/send-message": "Send message to Claude Code (POST)",
            "/api/conversation/:sessionId": "Get conversation history"
        },
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn sessions(State(state): State<AppState>) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let sessions = tokio::task::spawn_blocking(move || store.list_sessions())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Error getting sessions");
            ApiError::from(e)
        })?;

    tracing::debug!(count = sessions.len(), "Listed sessions");
    Ok(Json(json!({ "sessions": sessions })).into_response())
}

async fn send_message(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    const REQUIRED: &str = "sessionId and message are required";

    let request: SendMessageRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request(REQUIRED))?;
    let (Some(session_id), Some(message)) = (
        request.session_id.filter(|s| !s.is_empty()),
        request.message.filter(|m| !m.is_empty()),
    ) else {
        return Err(ApiError::bad_request(REQUIRED));
    };
    let project_path = request.project_path;

    let store = state.store.clone();
    let (sid, text) = (session_id.clone(), message.clone());
    let result = tokio::task::spawn_blocking(move || {
        store.send(&sid, &text, project_path.as_deref())
    })
    .await?;

    let receipt = result.map_err(|e| {
        tracing::error!(session_id = %session_id, error = %e, "Error sending message");
        ApiError::from(e)
    })?;

    tracing::info!(
        session_id = %receipt.session_id,
        message_id = %receipt.message_id,
        "Message sent"
    );
    state.notifier.dispatch(&message);

    Ok(Json(json!({
        "success": true,
        "messageId": receipt.message_id,
        "sessionId": receipt.session_id,
        "message": "Message sent to Claude Code conversation",
    }))
    .into_response())
}

async fn conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ConversationQuery>,
) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let sid = session_id.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.conversation(&sid, query.project_path.as_deref())
    })
    .await?;

    let records = result.map_err(|e| {
        tracing::error!(session_id = %session_id, error = %e, "Error getting conversation");
        ApiError::from(e)
    })?;

    tracing::debug!(session_id = %session_id, records = records.len(), "Loaded conversation");
    Ok(Json(json!({ "conversation": records })).into_response())
}

/// Serve until Ctrl-C.
pub async fn run_http_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        projects_dir = %state.store.projects_dir().display(),
        notifier = ?state.notifier,
        "Claude API Proxy running"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Claude API Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
