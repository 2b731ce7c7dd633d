//! Gateway driven by browser callbacks.
//!
//! The widget runs in the shopper's browser; the storefront only learns the
//! outcome when the browser posts it back. Pending sessions are held in a
//! `moka` cache keyed by gateway session ID so an abandoned widget does not
//! pin its sink forever.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, info, warn};

use super::{GatewayError, PaymentGateway, PaymentResult, PaymentResultSink, PaymentSession};

/// Maximum number of simultaneously open sessions.
const MAX_PENDING_SESSIONS: u64 = 10_000;

type PendingSlot = Arc<Mutex<Option<PaymentResultSink>>>;

/// [`PaymentGateway`] completed through [`CallbackGateway::complete`].
#[derive(Clone)]
pub struct CallbackGateway {
    inner: Arc<CallbackGatewayInner>,
}

struct CallbackGatewayInner {
    pending: Cache<String, PendingSlot>,
}

impl CallbackGateway {
    /// Create a gateway whose sessions expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let pending = Cache::builder()
            .max_capacity(MAX_PENDING_SESSIONS)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CallbackGatewayInner { pending }),
        }
    }

    /// Deliver the widget's result for a pending session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownSession`] if the session was never
    /// opened, was already completed, was closed, or has expired.
    pub fn complete(&self, gateway_session_id: &str, result: PaymentResult) -> Result<(), GatewayError> {
        let unknown = || GatewayError::UnknownSession(gateway_session_id.to_string());

        let slot = self.inner.pending.remove(gateway_session_id).ok_or_else(unknown)?;
        let sink = slot
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
            .ok_or_else(unknown)?;

        let attempt = sink.attempt();
        if sink.deliver(result) {
            info!(gateway_session_id, attempt = %attempt, "Payment result delivered");
            Ok(())
        } else {
            warn!(gateway_session_id, attempt = %attempt, "Checkout gone before payment result arrived");
            Err(unknown())
        }
    }

    /// Whether a session is still waiting for its result.
    #[must_use]
    pub fn is_pending(&self, gateway_session_id: &str) -> bool {
        self.inner.pending.contains_key(gateway_session_id)
    }
}

impl PaymentGateway for CallbackGateway {
    fn open(&self, session: &PaymentSession, sink: PaymentResultSink) -> Result<(), GatewayError> {
        if session.key_id.trim().is_empty() {
            return Err(GatewayError::Unavailable(
                "gateway key is not configured".to_string(),
            ));
        }
        if session.gateway_session_id.trim().is_empty() {
            return Err(GatewayError::Unavailable(
                "gateway did not return a session".to_string(),
            ));
        }

        debug!(
            gateway_session_id = %session.gateway_session_id,
            order_id = %session.order_id,
            attempt = %sink.attempt(),
            "Payment session opened"
        );
        self.inner.pending.insert(
            session.gateway_session_id.clone(),
            Arc::new(Mutex::new(Some(sink))),
        );
        Ok(())
    }

    fn close(&self, gateway_session_id: &str) {
        if self.inner.pending.remove(gateway_session_id).is_some() {
            debug!(gateway_session_id, "Payment session closed");
        }
    }
}
