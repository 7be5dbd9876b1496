use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::state::AppState;

pub async fn reload(State(state): State<AppState>) -> Response {
    let Some(reloader) = state.reloader.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "error": "reload not available"})),
        )
            .into_response();
    };

    match reloader.reload().await {
        Ok(summary) => {
            state.mark_ready();
            (StatusCode::OK, Json(json!({"status": "success", "data": summary}))).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "error": e.to_string()})),
        )
            .into_response(),
    }
}
