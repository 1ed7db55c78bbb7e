//! Health probe — `GET /v1/health`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// Reports process liveness plus datastore reachability and whether an
/// LLM provider is configured.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (datastore_ok, datastore) = match state.store.health().await {
        Ok(detail) => (true, detail),
        Err(e) => (false, serde_json::json!({ "error": e.to_string() })),
    };

    let status = if datastore_ok { "ok" } else { "degraded" };
    let code = if datastore_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "datastore": datastore,
            "llmConfigured": state.provider.is_some(),
        })),
    )
}
