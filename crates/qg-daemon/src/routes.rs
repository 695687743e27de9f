//! Axum router and all HTTP handlers.
//!
//! `build_router` is the single entry point; `main.rs` attaches middleware
//! layers after this call so scenario tests can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::error;
use uuid::Uuid;

use qg_schemas::{SignalResponse, TradingSignal};

use crate::{
    api_types::{ErrorResponse, HaltActionRequest, HaltActionResponse, HealthResponse},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        .route("/health/live", get(health_live))
        .route("/api/v1/signals", post(ingest_signal))
        .route("/api/v1/kill-switch/activate", post(kill_switch_activate))
        .route("/api/v1/kill-switch/deactivate", post(kill_switch_deactivate))
        .route("/api/v1/kill-switch/status", get(kill_switch_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: st.build.service,
    })
}

pub(crate) async fn health_ready(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ready",
        service: st.build.service,
    })
}

pub(crate) async fn health_live(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "alive",
        service: st.build.service,
    })
}

// ---------------------------------------------------------------------------
// POST /api/v1/signals
// ---------------------------------------------------------------------------

/// Ingest one trading signal.
///
/// Structural validation failure returns `422` with a REJECTED
/// [`SignalResponse`] and never enters the pipeline (no broker contact).
/// A processed signal returns `200` whether approved or risk-rejected; the
/// body's `status` carries the outcome.
pub(crate) async fn ingest_signal(
    State(st): State<Arc<AppState>>,
    Json(signal): Json<TradingSignal>,
) -> Response {
    let signal = match signal.normalized() {
        Ok(s) => s,
        Err(e) => {
            let resp = SignalResponse::rejected(
                Uuid::new_v4().to_string(),
                format!("Invalid signal: {e}"),
                vec![e.to_string()],
            );
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(resp)).into_response();
        }
    };

    match st.pipeline.process_signal(&signal).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            error!(error = %e, "signal processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Signal processing failed: {e}"),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Kill-switch admin
// ---------------------------------------------------------------------------

pub(crate) async fn kill_switch_activate(
    State(st): State<Arc<AppState>>,
    body: Option<Json<HaltActionRequest>>,
) -> Response {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "Manual activation".to_string());

    match st.pipeline.kill_switch().activate(&reason).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HaltActionResponse {
                status: "activated",
                reason,
            }),
        )
            .into_response(),
        Err(e) => store_unavailable(e),
    }
}

pub(crate) async fn kill_switch_deactivate(
    State(st): State<Arc<AppState>>,
    body: Option<Json<HaltActionRequest>>,
) -> Response {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "Manual deactivation".to_string());

    match st.pipeline.kill_switch().deactivate(&reason).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HaltActionResponse {
                status: "deactivated",
                reason,
            }),
        )
            .into_response(),
        Err(e) => store_unavailable(e),
    }
}

pub(crate) async fn kill_switch_status(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(st.pipeline.kill_switch().status().await)
}

fn store_unavailable(e: qg_halt::StoreError) -> Response {
    error!(error = %e, "kill-switch store unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse { error: e.to_string() }),
    )
        .into_response()
}
