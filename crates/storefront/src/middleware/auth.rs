//! Bearer credential extraction.
//!
//! The storefront does not authenticate shoppers itself; it forwards the
//! shopper's bearer token to the order backend, which decides.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::orders::BearerToken;

/// Extractor that requires an `Authorization: Bearer <token>` header.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(Bearer(token): Bearer) -> impl IntoResponse {
///     // forward `token` to the order backend
/// }
/// ```
pub struct Bearer(pub BearerToken);

/// Rejection when no usable bearer credential is present.
#[derive(Debug)]
pub struct BearerRejection;

impl IntoResponse for BearerRejection {
    fn into_response(self) -> Response {
        AppError::Unauthorized("missing bearer credential".to_string()).into_response()
    }
}

impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = BearerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .map(|token| Self(BearerToken::new(token)))
            .ok_or(BearerRejection)
    }
}

/// Token from an `Authorization` header value, if it is a non-empty bearer token.
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer   token "), Some("token"));
        assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer"), None);
    }
}
