//! REST handlers for event ingress, the event log and operational probes.

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_analytics::{DispatchRecord, EventLog};
use relay_core::event::parse_body;
use relay_core::{CanonicalEvent, RelayError, RequestMeta};
use relay_destinations::DestinationRouter;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<DestinationRouter>,
    pub log: Arc<EventLog>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(router: Arc<DestinationRouter>, log: Arc<EventLog>) -> Self {
        Self {
            router,
            log,
            start_time: Instant::now(),
        }
    }
}

/// POST /event. Relay a conversion event.
///
/// The response mirrors the primary destination's status and body. Secondary
/// destinations only ever show up in the event log.
pub async fn handle_event(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    metrics::counter!("relay.events.received").increment(1);

    let forwarded_for = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let meta = RequestMeta::new(peer.ip().to_string(), forwarded_for);

    let event = match parse_body(&body).and_then(|raw| CanonicalEvent::build(&raw, &meta)) {
        Ok(event) => event,
        Err(e) => return reject(e),
    };

    let products = event.products();
    let report = state.router.dispatch(&event, &products).await;

    state.log.append(DispatchRecord::new(&event, &report));

    info!(
        event_name = %event.event_name,
        event_id = event.event_id.as_deref().unwrap_or_default(),
        meta_status = ?report.meta.status_code(),
        tiktok_status = ?report.tiktok.status_code(),
        reddit_status = ?report.reddit.status_code(),
        "Event relayed"
    );

    match report.primary().response() {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(body.clone()),
        )
            .into_response(),
        None => ErrorResponse::new("primary destination is not configured").into_response(),
    }
}

fn reject(error: RelayError) -> Response {
    metrics::counter!("relay.events.rejected").increment(1);
    if error.is_client_error() {
        warn!(error = %error, "Event rejected");
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response()
    } else {
        warn!(error = %error, "Event could not be built");
        ErrorResponse::new(error).into_response()
    }
}

/// GET /event-log. Recorded dispatches, newest first.
pub async fn event_log(State(state): State<AppState>) -> Json<Vec<DispatchRecord>> {
    Json(state.log.snapshot())
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        log_entries: state.log.len(),
        log_capacity: state.log.capacity(),
    })
}

/// GET /live. Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl ToString) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub log_entries: usize,
    pub log_capacity: usize,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
