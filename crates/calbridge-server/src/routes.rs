//! HTTP routes.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use calbridge_protocol::{
    CreateEventRequest, CreatedResponse, DeleteEventRequest, EventsResponse, OkResponse,
    RangeQuery,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::BridgeResult;
use crate::service::EventService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EventService>,
}

impl AppState {
    pub fn new(service: EventService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Builds the bridge router, with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/get_events", post(get_events))
        .route("/create_event", post(create_event))
        .route("/delete_event", post(delete_event))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn health() -> Json<OkResponse> {
    Json(OkResponse::ok())
}

/// POST /get_events
async fn get_events(
    State(state): State<AppState>,
    body: Result<Json<RangeQuery>, JsonRejection>,
) -> BridgeResult<Json<EventsResponse>> {
    let Json(query) = body?;
    let events = state
        .service
        .list_events(&query.start_iso, &query.end_iso)
        .await?;
    Ok(Json(EventsResponse { events }))
}

/// POST /create_event
async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> BridgeResult<Json<CreatedResponse>> {
    let Json(request) = body?;
    let uid = state.service.create_event(request).await?;
    Ok(Json(CreatedResponse::new(uid)))
}

/// POST /delete_event
async fn delete_event(
    State(state): State<AppState>,
    body: Result<Json<DeleteEventRequest>, JsonRejection>,
) -> BridgeResult<Json<OkResponse>> {
    let Json(request) = body?;
    state.service.delete_event(&request.uid).await?;
    Ok(Json(OkResponse::ok()))
}
