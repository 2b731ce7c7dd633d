//! Re-authentication redirect.
//!
//! Any 401 leaving the storefront gets a `Location` header pointing at the
//! configured login URL, so the browser can send the shopper there whether
//! the 401 came from a missing credential or from the order backend.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Middleware that adds the login redirect to 401 responses.
pub async fn login_redirect_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if response.status() == StatusCode::UNAUTHORIZED
        && let Ok(location) = HeaderValue::from_str(&state.config().login_url)
    {
        response.headers_mut().insert(header::LOCATION, location);
    }

    response
}
