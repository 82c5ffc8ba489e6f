use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        ApiEnvelope, ListRegistrationsQuery, RegistrationRecord, SubmitRegistrationRequest,
        UpdateStatusRequest,
    },
};

pub mod api;
pub mod app_state;
pub mod config;

use api::{list_registrations, submit_registration, update_status};
pub use app_state::AppState;

type EnvelopeResponse<T> = (StatusCode, Json<ApiEnvelope<T>>);

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/hotels/registrations",
            get(http_list_registrations).post(http_submit_registration),
        )
        .route(
            "/api/hotels/registrations/:id/status",
            put(http_update_status),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_list_registrations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRegistrationsQuery>,
) -> EnvelopeResponse<Vec<RegistrationRecord>> {
    match list_registrations(&state.api, query.status.as_deref()).await {
        Ok(records) => (StatusCode::OK, Json(ApiEnvelope::ok(records))),
        Err(err) => failure(err),
    }
}

async fn http_update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> EnvelopeResponse<()> {
    let status = req.status;
    match update_status(&state.api, &id, req).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiEnvelope::done(format!("Hotel registration {status}"))),
        ),
        Err(err) => failure(err),
    }
}

async fn http_submit_registration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitRegistrationRequest>,
) -> EnvelopeResponse<RegistrationRecord> {
    match submit_registration(&state.api, req).await {
        Ok(record) => (StatusCode::CREATED, Json(ApiEnvelope::ok(record))),
        Err(err) => failure(err),
    }
}

fn failure<T>(err: ApiError) -> EnvelopeResponse<T> {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiEnvelope::from(err)))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
