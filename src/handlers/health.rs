use axum::response::Json;
use serde_json::{json, Value};
use tracing::instrument;

/// GET /health/status
#[instrument(name = "health_check")]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "menu-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_reports_service() {
        let Json(body) = health_check().await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "menu-rs");
        assert!(body["timestamp"].is_string());
    }
}
