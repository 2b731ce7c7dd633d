//! Checkout states, failures and the events that drive them.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use food_order_core::{OrderId, PaymentMethod};

use crate::gateway::{PaymentResult, PaymentSession};
use crate::orders::{FieldErrors, GatewayOrder, Order, OrderServiceError};

/// Message shown for faults the shopper cannot fix.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Correlation ID for one checkout attempt.
///
/// Every asynchronous result carries the attempt it belongs to; results for
/// any other attempt are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// A fresh, random attempt ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a checkout is.
///
/// ```text
/// Idle → ValidatingDetails → AwaitingOrderCreation ─┬─ cash ──→ Finalizing ─────────→ Settled
///   ↑           │                                   └─ online → AwaitingPaymentResult ─┤
///   └───────────┘ (invalid details)                                                    └→ Failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    /// Nothing submitted.
    Idle,
    /// Checking delivery details.
    ValidatingDetails,
    /// Order creation request in flight.
    AwaitingOrderCreation {
        attempt: AttemptId,
        method: PaymentMethod,
    },
    /// Cash order created; clearing the cart.
    Finalizing { order: Order },
    /// Online order created; waiting on the gateway.
    ///
    /// `session` is `None` until the payment session has been opened.
    /// `verifying` is set once the gateway reported success and the
    /// verification request is in flight.
    AwaitingPaymentResult {
        attempt: AttemptId,
        order: Order,
        session: Option<PaymentSession>,
        verifying: bool,
    },
    /// Order placed and, for online orders, payment verified.
    Settled { order: Order },
    /// The attempt failed; submit again or reset to retry.
    Failed { failure: CheckoutFailure },
}

impl CheckoutState {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ValidatingDetails => "validating_details",
            Self::AwaitingOrderCreation { .. } => "awaiting_order_creation",
            Self::Finalizing { .. } => "finalizing",
            Self::AwaitingPaymentResult { .. } => "awaiting_payment_result",
            Self::Settled { .. } => "settled",
            Self::Failed { .. } => "failed",
        }
    }

    /// The attempt whose results this state is waiting for.
    #[must_use]
    pub const fn attempt(&self) -> Option<AttemptId> {
        match self {
            Self::AwaitingOrderCreation { attempt, .. }
            | Self::AwaitingPaymentResult { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    /// Whether a network round-trip or gateway result is outstanding.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::AwaitingOrderCreation { .. }
                | Self::Finalizing { .. }
                | Self::AwaitingPaymentResult { .. }
        )
    }

    /// Whether the attempt has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled { .. } | Self::Failed { .. })
    }
}

/// Why a checkout attempt ended in [`CheckoutState::Failed`].
///
/// The cart is kept in every case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutFailure {
    /// The order service rejected the submitted fields.
    #[error("order rejected: {message}")]
    FieldValidation {
        message: String,
        field_errors: FieldErrors,
    },

    /// The shopper may not place this order.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// The order service could not be reached.
    #[error("network error: {message}")]
    Network { message: String },

    /// The order service failed.
    #[error("server error: {message}")]
    Server { message: String },

    /// The gateway reported failure or cancellation, or could not be opened.
    #[error("payment for order {order_id} failed: {reason}")]
    PaymentFailed { order_id: OrderId, reason: String },

    /// No gateway result arrived in time.
    #[error("payment for order {order_id} timed out")]
    PaymentTimedOut { order_id: OrderId },

    /// The gateway reported success but the payment could not be confirmed.
    #[error("payment verification for order {order_id} failed: {message}")]
    VerificationFailed { order_id: OrderId, message: String },
}

impl CheckoutFailure {
    /// Map an order creation error. `AuthRequired` is handled before this.
    #[must_use]
    pub fn from_order_creation(error: OrderServiceError) -> Self {
        match error {
            OrderServiceError::Validation {
                message,
                field_errors,
            } => Self::FieldValidation {
                message,
                field_errors,
            },
            OrderServiceError::Forbidden(message) => Self::Forbidden { message },
            OrderServiceError::NotFound(message) => Self::FieldValidation {
                message,
                field_errors: FieldErrors::new(),
            },
            OrderServiceError::Network(_) => Self::Network {
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            },
            // Backend error text stays in the logs; it can carry internals.
            OrderServiceError::AuthRequired
            | OrderServiceError::Server { .. }
            | OrderServiceError::Verification(_)
            | OrderServiceError::Parse(_) => Self::Server {
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            },
        }
    }

    /// Text shown to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::FieldValidation { message, .. }
            | Self::Forbidden { message }
            | Self::Network { message }
            | Self::Server { message } => message.clone(),
            Self::PaymentFailed { reason, .. } => {
                format!("Payment failed: {reason}. Your cart has been kept so you can try again.")
            }
            Self::PaymentTimedOut { .. } => {
                "Payment was not completed in time. Your cart has been kept so you can try again."
                    .to_string()
            }
            Self::VerificationFailed { order_id, .. } => format!(
                "We could not confirm your payment for order {order_id}. \
                 If you were charged, please contact support with this order number."
            ),
        }
    }

    /// Whether submitting again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Forbidden { .. } | Self::VerificationFailed { .. })
    }

    /// The order exists and money may have been taken without confirmation.
    #[must_use]
    pub const fn requires_support(&self) -> bool {
        matches!(self, Self::VerificationFailed { .. })
    }
}

/// Asynchronous results fed back into the orchestrator.
#[derive(Debug)]
pub enum CheckoutEvent {
    /// `create_order` returned.
    OrderCreated {
        attempt: AttemptId,
        result: Result<Order, OrderServiceError>,
    },
    /// `create_payment_session` returned.
    PaymentSessionCreated {
        attempt: AttemptId,
        result: Result<GatewayOrder, OrderServiceError>,
    },
    /// The gateway widget reported its result.
    GatewayResult {
        attempt: AttemptId,
        result: PaymentResult,
    },
    /// `verify_payment` returned.
    PaymentVerified {
        attempt: AttemptId,
        result: Result<Order, OrderServiceError>,
    },
    /// The payment timer fired.
    PaymentTimedOut { attempt: AttemptId },
}

impl CheckoutEvent {
    /// The attempt this event belongs to.
    #[must_use]
    pub const fn attempt(&self) -> AttemptId {
        match self {
            Self::OrderCreated { attempt, .. }
            | Self::PaymentSessionCreated { attempt, .. }
            | Self::GatewayResult { attempt, .. }
            | Self::PaymentVerified { attempt, .. }
            | Self::PaymentTimedOut { attempt } => *attempt,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::PaymentSessionCreated { .. } => "payment_session_created",
            Self::GatewayResult { .. } => "gateway_result",
            Self::PaymentVerified { .. } => "payment_verified",
            Self::PaymentTimedOut { .. } => "payment_timed_out",
        }
    }
}

impl fmt::Display for CheckoutEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// What [`super::CheckoutOrchestrator::handle`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutUpdate {
    /// The event moved the checkout forward.
    Applied,
    /// The event was stale or arrived in the wrong state.
    Discarded,
    /// The credential expired; the checkout was aborted to `Idle`.
    ReauthenticationRequired,
}

/// Reasons [`super::CheckoutOrchestrator::submit`] rejects a submission
/// outright. Nothing is sent to the network in any of these cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// There is nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Another attempt is still in flight.
    #[error("checkout already in progress")]
    InProgress,

    /// Delivery details failed local validation.
    #[error("invalid delivery details")]
    Validation(FieldErrors),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_with_reason_tag() {
        let failure = CheckoutFailure::PaymentTimedOut {
            order_id: OrderId::new(42),
        };
        let json = serde_json::to_value(&failure).expect("serialize");
        assert_eq!(json["kind"], "payment_timed_out");
        assert_eq!(json["order_id"], 42);
    }

    #[test]
    fn test_state_serializes_with_state_tag() {
        let json = serde_json::to_value(CheckoutState::Idle).expect("serialize");
        assert_eq!(json["state"], "idle");

        let failed = CheckoutState::Failed {
            failure: CheckoutFailure::Network {
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            },
        };
        let json = serde_json::to_value(&failed).expect("serialize");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["failure"]["kind"], "network");
    }

    #[test]
    fn test_order_creation_error_mapping() {
        let failure = CheckoutFailure::from_order_creation(OrderServiceError::Validation {
            message: "bad".to_string(),
            field_errors: FieldErrors::from([(
                "deliveryPhone".to_string(),
                "invalid".to_string(),
            )]),
        });
        assert!(matches!(
            failure,
            CheckoutFailure::FieldValidation { ref field_errors, .. } if field_errors.contains_key("deliveryPhone")
        ));

        let failure = CheckoutFailure::from_order_creation(OrderServiceError::Network(
            "connection refused".to_string(),
        ));
        assert_eq!(failure.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(failure.is_retryable());
    }

    #[test]
    fn test_server_error_text_is_not_shown_to_shopper() {
        let failure = CheckoutFailure::from_order_creation(OrderServiceError::Server {
            status: 500,
            message: "NullPointerException at OrderService.java:88".to_string(),
        });
        assert!(matches!(failure, CheckoutFailure::Server { .. }));
        assert_eq!(failure.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(failure.is_retryable());

        let json = serde_json::to_value(&failure).unwrap();
        assert!(!json.to_string().contains("NullPointerException"));
    }

    #[test]
    fn test_verification_failure_is_distinguished() {
        let failure = CheckoutFailure::VerificationFailed {
            order_id: OrderId::new(7),
            message: "signature mismatch".to_string(),
        };
        assert!(failure.requires_support());
        assert!(!failure.is_retryable());
        assert!(failure.user_message().contains("order 7"));

        let failure = CheckoutFailure::PaymentFailed {
            order_id: OrderId::new(7),
            reason: "cancelled".to_string(),
        };
        assert!(!failure.requires_support());
        assert!(failure.is_retryable());
    }

    #[test]
    fn test_state_flags() {
        let attempt = AttemptId::new();
        let creating = CheckoutState::AwaitingOrderCreation {
            attempt,
            method: PaymentMethod::CashOnDelivery,
        };
        assert!(creating.is_in_flight());
        assert_eq!(creating.attempt(), Some(attempt));
        assert!(!CheckoutState::Idle.is_in_flight());
        assert_eq!(CheckoutState::Idle.attempt(), None);
        assert_ne!(AttemptId::new(), attempt);
    }
}
