//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{RegistryError, StateView};
use crate::util::time::{unix_millis, uptime_secs};
use crate::ws::handler::ws_handler;
use crate::ws::protocol::InputMsg;

/// Upper bound for a plain HTTP request; upgraded sockets are not affected
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allow_origin = if state.config.client_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();
        AllowOrigin::list(allowed_origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/matches/remote", post(create_remote_handler))
        .route("/matches/local", post(create_local_handler))
        .route("/matches/:id/input", post(input_handler))
        .route("/matches/:id/state", get(state_handler))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: u64,
    uptime_secs: u64,
    active_matches: usize,
    online_clients: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        server_time: unix_millis(),
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        online_clients: state.hub.online_count(),
    })
}

// ============================================================================
// Match creation
// ============================================================================

#[derive(Deserialize)]
struct CreateRemoteRequest {
    match_id: i64,
    player_a: Uuid,
    player_b: Uuid,
}

#[derive(Deserialize)]
struct CreateLocalRequest {
    player: Uuid,
}

#[derive(Serialize)]
struct MatchCreatedResponse {
    match_id: i64,
}

async fn create_remote_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateRemoteRequest>,
) -> Result<(StatusCode, Json<MatchCreatedResponse>), AppError> {
    let handle = state
        .match_registry
        .create_remote_match(req.match_id, req.player_a, req.player_b)?;

    info!(match_id = handle.id, "Remote match created over HTTP");
    Ok((
        StatusCode::CREATED,
        Json(MatchCreatedResponse { match_id: handle.id }),
    ))
}

async fn create_local_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateLocalRequest>,
) -> Result<(StatusCode, Json<MatchCreatedResponse>), AppError> {
    let handle = state.match_registry.create_local_match(req.player)?;

    Ok((
        StatusCode::CREATED,
        Json(MatchCreatedResponse { match_id: handle.id }),
    ))
}

// ============================================================================
// Input and state
// ============================================================================

/// Remote: `{sender, up, down}`. Local: `{p1_up, p1_down, p2_up, p2_down}`.
#[derive(Deserialize)]
struct InputRequest {
    sender: Option<Uuid>,
    up: Option<bool>,
    down: Option<bool>,
    p1_up: Option<bool>,
    p1_down: Option<bool>,
    p2_up: Option<bool>,
    p2_down: Option<bool>,
}

impl From<InputRequest> for InputMsg {
    fn from(req: InputRequest) -> Self {
        InputMsg {
            client_id: req.sender,
            up: req.up,
            down: req.down,
            p1_up: req.p1_up,
            p1_down: req.p1_down,
            p2_up: req.p2_up,
            p2_down: req.p2_down,
        }
    }
}

async fn input_handler(
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
    Json(req): Json<InputRequest>,
) -> Result<StatusCode, AppError> {
    state
        .match_registry
        .submit_input(match_id, &InputMsg::from(req))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn state_handler(
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
) -> Result<Json<StateView>, AppError> {
    Ok(Json(state.match_registry.state(match_id)?))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<RegistryError> for AppError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(_) => AppError::NotFound(e.to_string()),
            RegistryError::DuplicateMatch(_) | RegistryError::ParticipantBusy(_) => {
                AppError::Conflict(e.to_string())
            }
            RegistryError::InvalidParticipants
            | RegistryError::InvalidMatchId(_)
            | RegistryError::InputRejected(_) => AppError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
