use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::state::ApiState;

/// Admin authentication: a single bearer token compared in constant time.
pub async fn api_auth(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = match state.admin_token.as_deref() {
        Some(token) => token,
        // No token configured: the admin surface stays closed.
        None => return ApiError::unauthorized().into_response(),
    };

    let presented =
        extract_token(request.headers().get(axum::http::header::AUTHORIZATION)).or_else(|| {
            request
                .headers()
                .get("x-api-key")
                .and_then(|v| v.to_str().ok().map(|s| s.to_string()))
        });

    let presented = match presented {
        Some(value) => value,
        None => return ApiError::unauthorized().into_response(),
    };

    let matches: bool = presented
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into();
    if !matches {
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}

fn extract_token(header: Option<&axum::http::HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.to_string())
}
