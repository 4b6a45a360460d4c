use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, MethodRouter},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use models::{StatusDocument, UpdateRequest};
use service::StatusStore;

use crate::errors::JsonApiError;

#[derive(Clone)]
pub struct AppState {
    pub status: StatusStore,
}

impl AppState {
    pub fn new(status: StatusStore) -> Self {
        Self { status }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: String,
    #[serde(with = "models::timestamp")]
    pub last_updated: DateTime<Utc>,
}

/// GET: current document, never cached.
pub async fn read_status(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, JsonApiError> {
    let doc: StatusDocument = state.status.read().await?;
    Ok((
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(doc),
    ))
}

/// POST `{source, data}`: overwrite one source.
pub async fn update_status(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, JsonApiError> {
    let Json(req) = payload.map_err(|e| {
        warn!(error = %e.body_text(), "malformed status update body");
        JsonApiError::invalid_source()
    })?;
    let result = state.status.update_source(&req.source, req.data).await?;
    Ok(Json(UpdateResponse { message: result.message(), last_updated: result.last_updated }))
}

/// OPTIONS without preflight headers: empty 200.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> JsonApiError {
    JsonApiError::method_not_allowed()
}

fn status_endpoint() -> MethodRouter<AppState> {
    // explicit HEAD route, otherwise axum answers HEAD with the GET handler
    get(read_status)
        .head(method_not_allowed)
        .post(update_status)
        .options(preflight)
        .fallback(method_not_allowed)
}

/// Build the application router. Every path is served by the same endpoint.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", status_endpoint())
        .route("/*path", status_endpoint())
        .with_state(state)
        // CorsLayer only adds these on preflight; plain responses need them too
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx 以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
