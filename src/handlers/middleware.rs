use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use serde_json::{json, Value};
use tracing::{error, warn};

type Rejection = (StatusCode, Json<Value>);

/// Limits enforced before a request reaches the handlers
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_request_size: usize,
}

/// Rejects bodies that are not JSON or that declare a size above the limit
pub async fn request_validation_middleware(
    State(limits): State<RequestLimits>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Rejection> {
    validate_content_type(&request)?;
    validate_request_size(&request, limits.max_request_size)?;

    Ok(next.run(request).await)
}

fn rejection(status: StatusCode, error: &str, details: String) -> Rejection {
    (status, Json(json!({ "error": error, "details": details })))
}

fn validate_content_type(request: &Request<Body>) -> Result<(), Rejection> {
    let method = request.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(());
    }

    match request.headers().get(header::CONTENT_TYPE) {
        Some(content_type) => {
            let content_type_str = content_type.to_str().unwrap_or("");
            if content_type_str.starts_with("application/json") {
                Ok(())
            } else {
                warn!("Invalid content type: {}", content_type_str);
                Err(rejection(
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "Unsupported media type",
                    "Content-Type must be application/json".to_string(),
                ))
            }
        }
        None => {
            warn!("Missing content type header");
            Err(rejection(
                StatusCode::BAD_REQUEST,
                "Missing content type",
                "Content-Type header is required for requests with body".to_string(),
            ))
        }
    }
}

fn validate_request_size(request: &Request<Body>, max_request_size: usize) -> Result<(), Rejection> {
    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    match declared_length {
        Some(length) if length > max_request_size as u64 => {
            error!("Request too large: {} bytes", length);
            Err(rejection(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request too large",
                format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, max_request_size
                ),
            ))
        }
        _ => Ok(()),
    }
}
