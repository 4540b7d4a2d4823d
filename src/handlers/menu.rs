use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::models::{CreateMenuItemRequest, MenuItem, ServiceError, UpdateMenuItemRequest};
use crate::services::MenuItemService;

/// Shared state of the menu endpoints
#[derive(Clone)]
pub struct ApiState {
    pub menu_service: Arc<MenuItemService>,
    /// Whether 500 bodies carry the underlying cause in `details`
    pub expose_error_details: bool,
}

/// Error response with body `{error, details?}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Map a service failure. `storage_summary` names the operation that failed.
    fn from_service(err: ServiceError, storage_summary: &str, expose_details: bool) -> Self {
        match err {
            ServiceError::MenuItemNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "Menu item not found")
            }
            ServiceError::Validation(e) => {
                let api_error = Self::new(StatusCode::BAD_REQUEST, e.to_string());
                match e.details() {
                    Some(details) => api_error.with_details(details),
                    None => api_error,
                }
            }
            ServiceError::Storage { source } => {
                error!(error = %source, "{}", storage_summary);
                let api_error = Self::new(StatusCode::INTERNAL_SERVER_ERROR, storage_summary);
                if expose_details {
                    api_error.with_details(source.to_string())
                } else {
                    api_error
                }
            }
        }
    }

    fn from_rejection(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected request body");
        Self::new(rejection.status(), "Invalid request body").with_details(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Create the router for `/menu` and `/menu/:id`
pub fn create_menu_router(state: ApiState) -> Router {
    Router::new()
        .route("/menu", get(list_menu_items).post(create_menu_item))
        .route("/menu/:id", put(update_menu_item).delete(delete_menu_item))
        .with_state(state)
}

/// Accept only a JSON object and convert it into the request type
fn object_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = body.map_err(ApiError::from_rejection)?;

    if !value.is_object() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body")
            .with_details("Request body must be a JSON object"));
    }

    serde_json::from_value(value).map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body").with_details(e.to_string())
    })
}

/// POST /menu
#[instrument(name = "create_menu_item", skip(state, body))]
pub async fn create_menu_item(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let request: CreateMenuItemRequest = object_body(body)?;

    let item = state.menu_service.create(request).await.map_err(|e| {
        ApiError::from_service(e, "Failed to create menu item", state.expose_error_details)
    })?;

    info!(id = %item.id, "Menu item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /menu
#[instrument(name = "list_menu_items", skip(state))]
pub async fn list_menu_items(
    State(state): State<ApiState>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    let items = state.menu_service.list().await.map_err(|e| {
        ApiError::from_service(e, "Failed to fetch menu items", state.expose_error_details)
    })?;

    Ok(Json(items))
}

/// PUT /menu/:id
#[instrument(name = "update_menu_item", skip(state, body), fields(id = %id))]
pub async fn update_menu_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MenuItem>, ApiError> {
    let request: UpdateMenuItemRequest = object_body(body)?;

    let item = state.menu_service.update(&id, request).await.map_err(|e| {
        ApiError::from_service(e, "Failed to update menu item", state.expose_error_details)
    })?;

    Ok(Json(item))
}

/// DELETE /menu/:id
#[instrument(name = "delete_menu_item", skip(state), fields(id = %id))]
pub async fn delete_menu_item(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.menu_service.delete(&id).await.map_err(|e| {
        ApiError::from_service(e, "Failed to delete menu item", state.expose_error_details)
    })?;

    Ok(Json(json!({ "message": "Menu item deleted successfully" })))
}
