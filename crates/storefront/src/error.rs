//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side faults to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Responses are JSON: `{"message": "...", "fieldErrors": {...}}`, with
//! `fieldErrors` present only for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::checkout::{CheckoutError, GENERIC_FAILURE_MESSAGE};
use crate::gateway::GatewayError;
use crate::orders::{FieldErrors, OrderServiceError};

/// Message for validation failures without a more specific summary.
const VALIDATION_MESSAGE: &str = "Please correct the highlighted fields and try again.";

/// Message for 401 responses.
const REAUTHENTICATE_MESSAGE: &str = "Please sign in again to continue.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout submission rejected.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order backend call failed.
    #[error("Order service error: {0}")]
    OrderService(#[from] OrderServiceError),

    /// Payment gateway operation failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// No usable credential on the request, or it expired mid-checkout.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "fieldErrors", skip_serializing_if = "Option::is_none")]
    field_errors: Option<FieldErrors>,
}

impl AppError {
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Session(_) => true,
            Self::OrderService(err) => matches!(
                err,
                OrderServiceError::Network(_)
                    | OrderServiceError::Server { .. }
                    | OrderServiceError::Parse(_)
                    | OrderServiceError::Verification(_)
            ),
            Self::Gateway(err) => matches!(err, GatewayError::Unavailable(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::InProgress => StatusCode::CONFLICT,
                CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::OrderService(err) => match err {
                OrderServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                OrderServiceError::AuthRequired => StatusCode::UNAUTHORIZED,
                OrderServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderServiceError::Verification(_)
                | OrderServiceError::Network(_)
                | OrderServiceError::Server { .. }
                | OrderServiceError::Parse(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Gateway(err) => match err {
                GatewayError::UnknownSession(_) => StatusCode::NOT_FOUND,
                GatewayError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    // Don't expose internal error details to clients
    fn into_body(self) -> ErrorBody {
        let (message, field_errors) = match self {
            Self::Checkout(CheckoutError::EmptyCart) => ("Your cart is empty.".to_string(), None),
            Self::Checkout(CheckoutError::InProgress) => (
                "A checkout is already in progress.".to_string(),
                None,
            ),
            Self::Checkout(CheckoutError::Validation(fields)) => {
                (VALIDATION_MESSAGE.to_string(), Some(fields))
            }
            Self::OrderService(OrderServiceError::Validation {
                message,
                field_errors,
            }) => (message, Some(field_errors)),
            Self::OrderService(OrderServiceError::AuthRequired) | Self::Unauthorized(_) => {
                (REAUTHENTICATE_MESSAGE.to_string(), None)
            }
            Self::OrderService(
                OrderServiceError::Forbidden(message) | OrderServiceError::NotFound(message),
            )
            | Self::BadRequest(message) => (message, None),
            Self::Gateway(GatewayError::UnknownSession(_)) => (
                "Payment session not found or expired.".to_string(),
                None,
            ),
            Self::OrderService(_) | Self::Gateway(_) | Self::Session(_) => {
                (GENERIC_FAILURE_MESSAGE.to_string(), None)
            }
        };

        ErrorBody {
            message,
            field_errors,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("menu_item_id", "11")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
