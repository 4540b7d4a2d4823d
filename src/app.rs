use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::config::ServerConfig;
use crate::handlers::{
    create_menu_router, health_check, metrics_handler, request_validation_middleware, ApiState,
    RequestLimits,
};
use crate::observability::{observability_middleware, Metrics};
use crate::services::MenuItemService;

/// Build the full application router
pub fn create_app(
    metrics: Arc<Metrics>,
    menu_service: Arc<MenuItemService>,
    server: &ServerConfig,
) -> Router {
    let metrics_for_middleware = metrics.clone();

    let api_state = ApiState {
        menu_service,
        expose_error_details: server.expose_error_details,
    };
    let limits = RequestLimits {
        max_request_size: server.max_request_size,
    };

    let operational_routes = Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    create_menu_router(api_state)
        .merge(operational_routes)
        // The last layer added is the outermost
        .layer(DefaultBodyLimit::max(server.max_request_size))
        .layer(middleware::from_fn_with_state(
            limits,
            request_validation_middleware,
        ))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
