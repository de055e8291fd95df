use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use safecity_core::event::DocumentEvent;

use crate::error::ApiError;
use crate::model::ReportView;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(receive_event))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

/// Every routed event is acknowledged with 200, skips and transport
/// failures included, so the event source never redelivers on our account.
///
/// The invocation runs as its own task: a caller that disconnects or times
/// out does not cancel a delivery already in flight.
async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<DocumentEvent>,
) -> Result<Json<ReportView>, ApiError> {
    let registry = state.shared_registry();
    let report = tokio::spawn(async move { registry.dispatch(event).await })
        .await
        .map_err(|err| ApiError::Aborted {
            message: err.to_string(),
        })??;
    Ok(Json(ReportView::from(&report)))
}
