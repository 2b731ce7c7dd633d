//! Order backend boundary.
//!
//! # Architecture
//!
//! - [`OrderService`] is the contract the checkout orchestrator depends on
//! - [`HttpOrderService`] implements it against the backend REST API with `reqwest`
//! - Every request carries the shopper's [`BearerToken`]; a 401 surfaces as
//!   [`OrderServiceError::AuthRequired`] so callers can send the shopper to
//!   re-authenticate instead of reporting a checkout failure
//!
//! # Endpoints
//!
//! ```text
//! POST /orders                         - Create an order
//! GET  /orders/{id}                    - Fetch one order
//! GET  /orders/user                    - Current user's orders
//! PUT  /orders/{id}/status             - Update order status (admin)
//! PUT  /orders/{id}/payment-status     - Update payment status (admin)
//! POST /payments/create-order/{id}     - Open a gateway order for an order
//! POST /payments/verify                - Verify a gateway payment
//! ```

mod client;
pub mod types;

use std::fmt;
use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use food_order_core::OrderId;

pub use client::HttpOrderService;
pub use types::*;

/// Errors that can occur when calling the order backend.
#[derive(Debug, Clone, Error)]
pub enum OrderServiceError {
    /// The backend rejected the request's fields.
    #[error("validation failed: {message}")]
    Validation {
        /// Summary message from the backend.
        message: String,
        /// Per-field messages keyed by backend field name.
        field_errors: FieldErrors,
    },

    /// The credential is missing or expired.
    #[error("authentication required")]
    AuthRequired,

    /// The credential is valid but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend could not confirm a gateway payment.
    #[error("payment verification failed: {0}")]
    Verification(String),

    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a server-side failure.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the backend, if any.
        message: String,
    },

    /// The response body could not be understood.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl OrderServiceError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }
}

/// Shopper credential forwarded to the order backend.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Operations the checkout flow needs from the order backend.
///
/// Futures must be `Send` so calls can run on spawned tasks while the
/// orchestrator keeps handling events.
pub trait OrderService: Send + Sync + 'static {
    /// Create an order record from a draft.
    fn create_order(
        &self,
        credential: &BearerToken,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<Order, OrderServiceError>> + Send;

    /// Open a gateway order (payment session) for an existing order.
    fn create_payment_session(
        &self,
        credential: &BearerToken,
        order_id: OrderId,
    ) -> impl Future<Output = Result<GatewayOrder, OrderServiceError>> + Send;

    /// Verify a gateway payment and return the confirmed order.
    fn verify_payment(
        &self,
        credential: &BearerToken,
        proof: &PaymentVerification,
    ) -> impl Future<Output = Result<Order, OrderServiceError>> + Send;

    /// Fetch one order.
    fn get_order(
        &self,
        credential: &BearerToken,
        order_id: OrderId,
    ) -> impl Future<Output = Result<Order, OrderServiceError>> + Send;

    /// The current user's orders, newest first.
    fn list_orders(
        &self,
        credential: &BearerToken,
    ) -> impl Future<Output = Result<Vec<Order>, OrderServiceError>> + Send;
}
