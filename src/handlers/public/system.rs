use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service banner and route index
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "userhub-api",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "auth": "/auth/register, /auth/login (public)",
                "whoami": "/api/auth/whoami (protected)",
                "users": "/api/users[/:id] (admin)",
                "bulk": "/api/users/bulk/status, /api/users/bulk/role (admin)",
                "notifications": "/api/notifications (protected)",
                "channels": "/api/channels (protected)",
            }
        }
    }))
}

/// GET /health - storage liveness
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.users.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
