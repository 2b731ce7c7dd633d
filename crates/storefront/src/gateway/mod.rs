//! Payment gateway boundary.
//!
//! The gateway is an embedded third-party widget that finishes on its own
//! schedule, or never. The orchestrator opens it with a [`PaymentResultSink`]
//! and the gateway delivers exactly one [`PaymentResult`] through the sink
//! when (if) the widget reports back. The result arrives as a
//! [`CheckoutEvent::GatewayResult`] tagged with the attempt that opened it.

mod callback;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use food_order_core::OrderId;

use crate::checkout::{AttemptId, CheckoutEvent};
use crate::orders::GatewayOrder;

pub use callback::CallbackGateway;

/// Errors raised by a [`PaymentGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The widget could not be opened (failed to load, missing key, ...).
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// No pending session with this ID (never opened, already completed or expired).
    #[error("unknown payment session: {0}")]
    UnknownSession(String),
}

/// An open payment for one created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    /// Order being paid for.
    pub order_id: OrderId,
    /// Gateway-side order ID.
    pub gateway_session_id: String,
    /// Amount to charge.
    pub amount: Decimal,
    /// Currency code as reported by the backend.
    pub currency: String,
    /// Public key the widget is opened with.
    pub key_id: String,
}

impl PaymentSession {
    /// Build a session from the backend's gateway order.
    #[must_use]
    pub fn new(order_id: OrderId, gateway_order: GatewayOrder) -> Self {
        Self {
            order_id,
            gateway_session_id: gateway_order.order_id,
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            key_id: gateway_order.key_id,
        }
    }
}

/// Terminal result reported by the gateway widget.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentResult {
    /// The shopper paid; the signed proof must still be verified.
    Success {
        gateway_order_id: String,
        gateway_payment_id: String,
        signature: String,
    },
    /// The payment failed or the shopper cancelled.
    Failure { reason: String },
}

/// One-shot handle through which a gateway reports its result.
///
/// Consumed by [`PaymentResultSink::deliver`], so a session can report at
/// most once.
pub struct PaymentResultSink {
    attempt: AttemptId,
    tx: mpsc::UnboundedSender<CheckoutEvent>,
}

impl PaymentResultSink {
    pub(crate) const fn new(attempt: AttemptId, tx: mpsc::UnboundedSender<CheckoutEvent>) -> Self {
        Self { attempt, tx }
    }

    /// The attempt this sink reports to.
    #[must_use]
    pub const fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Deliver the result.
    ///
    /// Returns `false` if the checkout that opened the session is gone.
    pub fn deliver(self, result: PaymentResult) -> bool {
        self.tx
            .send(CheckoutEvent::GatewayResult {
                attempt: self.attempt,
                result,
            })
            .is_ok()
    }
}

impl fmt::Debug for PaymentResultSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentResultSink")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

/// A payment gateway the orchestrator can open sessions on.
pub trait PaymentGateway: Send + Sync + 'static {
    /// Open the widget for `session`. The result, if any, goes to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unavailable`] if the widget cannot be opened.
    fn open(&self, session: &PaymentSession, sink: PaymentResultSink) -> Result<(), GatewayError>;

    /// Withdraw a pending session. Later results for it are dropped.
    fn close(&self, _gateway_session_id: &str) {}
}
