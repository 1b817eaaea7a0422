use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::db::ping;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub llm: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/
pub async fn root_handler() -> Json<Banner> {
    Json(Banner {
        message: "JobHunter API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/health
/// `degraded` when the database does not answer a ping.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = ping(&state.db).await;
    if !database_ok {
        warn!("Health check database ping failed");
    }

    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" },
        database: if database_ok { "connected" } else { "disconnected" },
        llm: if state.llm.is_configured() {
            "configured"
        } else {
            "not_configured"
        },
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_banner_over_http() {
        let app = Router::new().route("/api/", get(root_handler));

        let response = app
            .oneshot(Request::builder().uri("/api/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json["message"], "JobHunter API",
            "Expected banner message, got {}",
            json["message"]
        );
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
