use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Liveness plus a parse of the data resource.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.feature_count().await {
        Ok(features) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "features": features,
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "isoline data unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "degraded",
                    "error": e,
                })),
            )
        }
    }
}
