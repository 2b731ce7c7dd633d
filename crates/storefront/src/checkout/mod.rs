//! Checkout orchestration.
//!
//! [`CheckoutOrchestrator`] owns a shopper's [`CartStore`] and drives one
//! checkout attempt at a time from submission to settlement.
//!
//! # Event flow
//!
//! Every network call and every gateway interaction runs off to the side and
//! reports back as a [`CheckoutEvent`] on the channel returned by
//! [`CheckoutOrchestrator::new`]. The owner of the orchestrator pumps that
//! channel into [`CheckoutOrchestrator::handle`]. Each event carries the
//! [`AttemptId`] of the attempt that started it; events for any attempt other
//! than the current one are discarded, so a late response can never touch a
//! newer attempt.
//!
//! # Cart clearing
//!
//! The cart is cleared only on settlement: a created cash order, or an online
//! payment the order service has verified. Every failure keeps it.

mod state;
mod validation;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use food_order_core::{OrderId, PaymentMethod};

use crate::cart::CartStore;
use crate::gateway::{PaymentGateway, PaymentResult, PaymentResultSink, PaymentSession};
use crate::orders::{
    BearerToken, GatewayOrder, Order, OrderDraft, OrderLineRequest, OrderService,
    OrderServiceError, PaymentVerification,
};
use crate::pricing::{PricingBreakdown, PricingCalculator};

pub use state::{
    AttemptId, CheckoutError, CheckoutEvent, CheckoutFailure, CheckoutState, CheckoutUpdate,
    GENERIC_FAILURE_MESSAGE,
};
pub use validation::{
    ADDRESS_FIELD, DeliveryDetails, INSTRUCTIONS_FIELD, PHONE_FIELD, ValidatedDelivery,
    validate_delivery,
};

/// Receiving end of an orchestrator's event channel.
#[derive(Debug)]
pub struct CheckoutEvents {
    rx: mpsc::UnboundedReceiver<CheckoutEvent>,
}

impl CheckoutEvents {
    /// Wait for the next event.
    ///
    /// Returns `None` once the orchestrator and every task it spawned are gone.
    pub async fn recv(&mut self) -> Option<CheckoutEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is ready.
    pub fn try_recv(&mut self) -> Option<CheckoutEvent> {
        self.rx.try_recv().ok()
    }
}

/// Per-shopper checkout state machine.
pub struct CheckoutOrchestrator<O, G> {
    cart: CartStore,
    pricing: PricingCalculator,
    orders: Arc<O>,
    gateway: Arc<G>,
    payment_timeout: Option<Duration>,
    state: CheckoutState,
    credential: Option<BearerToken>,
    quoted: Option<PricingBreakdown>,
    reauthentication_required: bool,
    events: mpsc::UnboundedSender<CheckoutEvent>,
    payment_timer: Option<JoinHandle<()>>,
}

impl<O: OrderService, G: PaymentGateway> CheckoutOrchestrator<O, G> {
    /// Create an orchestrator owning `cart`.
    ///
    /// `payment_timeout` bounds how long an opened gateway session may go
    /// without a result; `None` leaves it pending until [`Self::reset`].
    #[must_use]
    pub fn new(
        cart: CartStore,
        pricing: PricingCalculator,
        orders: Arc<O>,
        gateway: Arc<G>,
        payment_timeout: Option<Duration>,
    ) -> (Self, CheckoutEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            cart,
            pricing,
            orders,
            gateway,
            payment_timeout,
            state: CheckoutState::Idle,
            credential: None,
            quoted: None,
            reauthentication_required: false,
            events,
            payment_timer: None,
        };
        (orchestrator, CheckoutEvents { rx })
    }

    /// Current checkout state.
    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// The shopper's cart.
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// The shopper's cart, for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InProgress`] while an attempt is in flight,
    /// since settlement would clear changes made in the meantime.
    pub fn cart_mut(&mut self) -> Result<&mut CartStore, CheckoutError> {
        if self.state.is_in_flight() {
            return Err(CheckoutError::InProgress);
        }
        Ok(&mut self.cart)
    }

    /// Pricing for the current cart; `None` when it is empty.
    #[must_use]
    pub fn quote(&self) -> Option<PricingBreakdown> {
        self.pricing.breakdown(self.cart.state())
    }

    /// The gateway session waiting for a result, if any.
    #[must_use]
    pub const fn pending_payment(&self) -> Option<&PaymentSession> {
        match &self.state {
            CheckoutState::AwaitingPaymentResult {
                session: Some(session),
                verifying: false,
                ..
            } => Some(session),
            _ => None,
        }
    }

    /// Whether the last attempt was aborted because the credential expired.
    #[must_use]
    pub const fn reauthentication_required(&self) -> bool {
        self.reauthentication_required
    }

    /// Submit the cart for checkout.
    ///
    /// Validates `details`, builds the order draft and starts order creation.
    /// The outcome arrives later as events.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::InProgress`] if an attempt is already in flight
    /// - [`CheckoutError::EmptyCart`] if the cart has no lines
    /// - [`CheckoutError::Validation`] if the delivery details are invalid
    pub fn submit(
        &mut self,
        details: &DeliveryDetails,
        method: PaymentMethod,
        credential: BearerToken,
    ) -> Result<AttemptId, CheckoutError> {
        if self.state.is_in_flight() {
            warn!(state = self.state.name(), "Rejected checkout submission while in progress");
            return Err(CheckoutError::InProgress);
        }
        let Some(restaurant_id) = self.cart.restaurant_id() else {
            debug!("Rejected checkout submission with empty cart");
            return Err(CheckoutError::EmptyCart);
        };

        self.reauthentication_required = false;
        self.transition(CheckoutState::ValidatingDetails);

        let delivery = match validate_delivery(details) {
            Ok(delivery) => delivery,
            Err(field_errors) => {
                debug!(fields = ?field_errors.keys().collect::<Vec<_>>(), "Delivery details invalid");
                self.transition(CheckoutState::Idle);
                return Err(CheckoutError::Validation(field_errors));
            }
        };

        let draft = OrderDraft {
            restaurant_id,
            items: self
                .cart
                .lines()
                .iter()
                .map(|line| OrderLineRequest {
                    menu_item_id: line.menu_item_id,
                    quantity: line.quantity,
                    special_instructions: String::new(),
                })
                .collect(),
            delivery_address: delivery.address,
            delivery_phone: delivery.phone.into_inner(),
            delivery_instructions: delivery.instructions,
            payment_method: method,
        };

        let attempt = AttemptId::new();
        self.quoted = self.quote();
        self.credential = Some(credential.clone());
        self.transition(CheckoutState::AwaitingOrderCreation { attempt, method });

        let orders = Arc::clone(&self.orders);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = orders.create_order(&credential, &draft).await;
            let _ = events.send(CheckoutEvent::OrderCreated { attempt, result });
        });

        info!(attempt = %attempt, restaurant_id = %restaurant_id, method = %method, "Checkout submitted");
        Ok(attempt)
    }

    /// Apply an asynchronous result.
    pub fn handle(&mut self, event: CheckoutEvent) -> CheckoutUpdate {
        let attempt = event.attempt();
        if self.state.attempt() != Some(attempt) {
            debug!(
                attempt = %attempt,
                event = %event,
                state = self.state.name(),
                "Discarding event for another attempt"
            );
            return CheckoutUpdate::Discarded;
        }

        match event {
            CheckoutEvent::OrderCreated { result, .. } => self.on_order_created(attempt, result),
            CheckoutEvent::PaymentSessionCreated { result, .. } => {
                self.on_payment_session_created(attempt, result)
            }
            CheckoutEvent::GatewayResult { result, .. } => self.on_gateway_result(attempt, result),
            CheckoutEvent::PaymentVerified { result, .. } => {
                self.on_payment_verified(attempt, result)
            }
            CheckoutEvent::PaymentTimedOut { .. } => self.on_payment_timed_out(attempt),
        }
    }

    /// Abandon the current attempt and return to `Idle`.
    ///
    /// Any pending gateway session is withdrawn; results still in flight are
    /// discarded when they arrive.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InProgress`] once payment verification has
    /// started. The gateway has reported a result by then, so the attempt
    /// must wait for the backend's answer.
    pub fn reset(&mut self) -> Result<(), CheckoutError> {
        if let CheckoutState::AwaitingPaymentResult {
            attempt,
            order,
            verifying: true,
            ..
        } = &self.state
        {
            warn!(attempt = %attempt, order_id = %order.id, "Rejected checkout reset during payment verification");
            return Err(CheckoutError::InProgress);
        }
        self.close_pending_session();
        self.end_attempt();
        self.reauthentication_required = false;
        self.transition(CheckoutState::Idle);
        Ok(())
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    fn on_order_created(
        &mut self,
        attempt: AttemptId,
        result: Result<Order, OrderServiceError>,
    ) -> CheckoutUpdate {
        let CheckoutState::AwaitingOrderCreation { method, .. } = self.state else {
            return self.discard(attempt, "order_created");
        };

        let order = match result {
            Ok(order) => order,
            Err(OrderServiceError::AuthRequired) => return self.abort_for_reauthentication(),
            Err(e) => {
                warn!(attempt = %attempt, error = %e, "Order creation failed");
                return self.fail(CheckoutFailure::from_order_creation(e));
            }
        };

        self.check_total(&order);
        info!(attempt = %attempt, order_id = %order.id, order_number = %order.order_number, "Order created");

        match method {
            PaymentMethod::CashOnDelivery => {
                self.transition(CheckoutState::Finalizing {
                    order: order.clone(),
                });
                self.settle(order);
            }
            PaymentMethod::Online => {
                let order_id = order.id;
                self.transition(CheckoutState::AwaitingPaymentResult {
                    attempt,
                    order,
                    session: None,
                    verifying: false,
                });
                self.spawn_payment_session(attempt, order_id);
            }
        }
        CheckoutUpdate::Applied
    }

    fn on_payment_session_created(
        &mut self,
        attempt: AttemptId,
        result: Result<GatewayOrder, OrderServiceError>,
    ) -> CheckoutUpdate {
        let order_id = match &self.state {
            CheckoutState::AwaitingPaymentResult {
                order,
                session: None,
                ..
            } => order.id,
            _ => return self.discard(attempt, "payment_session_created"),
        };

        let gateway_order = match result {
            Ok(gateway_order) => gateway_order,
            Err(OrderServiceError::AuthRequired) => return self.abort_for_reauthentication(),
            Err(e) => {
                warn!(attempt = %attempt, order_id = %order_id, error = %e, "Payment session creation failed");
                return self.fail(CheckoutFailure::PaymentFailed {
                    order_id,
                    reason: "the payment could not be started".to_string(),
                });
            }
        };

        let payment = PaymentSession::new(order_id, gateway_order);
        let sink = PaymentResultSink::new(attempt, self.events.clone());
        if let Err(e) = self.gateway.open(&payment, sink) {
            warn!(attempt = %attempt, order_id = %order_id, error = %e, "Payment gateway unavailable");
            return self.fail(CheckoutFailure::PaymentFailed {
                order_id,
                reason: e.to_string(),
            });
        }

        info!(
            attempt = %attempt,
            order_id = %order_id,
            gateway_session_id = %payment.gateway_session_id,
            "Payment session opened"
        );
        if let CheckoutState::AwaitingPaymentResult { session, .. } = &mut self.state {
            *session = Some(payment);
        }
        self.arm_payment_timer(attempt);
        CheckoutUpdate::Applied
    }

    fn on_gateway_result(&mut self, attempt: AttemptId, result: PaymentResult) -> CheckoutUpdate {
        let order_id = match &self.state {
            CheckoutState::AwaitingPaymentResult {
                order,
                session: Some(_),
                verifying: false,
                ..
            } => order.id,
            _ => return self.discard(attempt, "gateway_result"),
        };

        match result {
            PaymentResult::Success {
                gateway_order_id,
                gateway_payment_id,
                signature,
            } => {
                self.cancel_payment_timer();
                if let CheckoutState::AwaitingPaymentResult { verifying, .. } = &mut self.state {
                    *verifying = true;
                }
                info!(attempt = %attempt, order_id = %order_id, "Gateway reported success, verifying payment");

                let proof = PaymentVerification {
                    order_id,
                    payment_method: PaymentMethod::Online,
                    gateway_order_id,
                    gateway_payment_id,
                    signature,
                };
                self.spawn_verification(attempt, proof);
                CheckoutUpdate::Applied
            }
            PaymentResult::Failure { reason } => {
                warn!(attempt = %attempt, order_id = %order_id, reason = %reason, "Gateway reported payment failure");
                self.fail(CheckoutFailure::PaymentFailed { order_id, reason })
            }
        }
    }

    fn on_payment_verified(
        &mut self,
        attempt: AttemptId,
        result: Result<Order, OrderServiceError>,
    ) -> CheckoutUpdate {
        let order_id = match &self.state {
            CheckoutState::AwaitingPaymentResult {
                order,
                verifying: true,
                ..
            } => order.id,
            _ => return self.discard(attempt, "payment_verified"),
        };

        match result {
            Ok(order) => {
                info!(attempt = %attempt, order_id = %order.id, "Payment verified");
                self.settle(order);
                CheckoutUpdate::Applied
            }
            Err(OrderServiceError::AuthRequired) => self.abort_for_reauthentication(),
            Err(e) => {
                warn!(attempt = %attempt, order_id = %order_id, error = %e, "Payment verification failed");
                let message = match e {
                    OrderServiceError::Verification(message) => message,
                    other => other.to_string(),
                };
                self.fail(CheckoutFailure::VerificationFailed { order_id, message })
            }
        }
    }

    fn on_payment_timed_out(&mut self, attempt: AttemptId) -> CheckoutUpdate {
        let order_id = match &self.state {
            CheckoutState::AwaitingPaymentResult {
                order,
                verifying: false,
                ..
            } => order.id,
            _ => return self.discard(attempt, "payment_timed_out"),
        };

        warn!(attempt = %attempt, order_id = %order_id, "No payment result before timeout");
        self.close_pending_session();
        self.fail(CheckoutFailure::PaymentTimedOut { order_id })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn spawn_payment_session(&self, attempt: AttemptId, order_id: OrderId) {
        let Some(credential) = self.credential.clone() else {
            return;
        };
        let orders = Arc::clone(&self.orders);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = orders.create_payment_session(&credential, order_id).await;
            let _ = events.send(CheckoutEvent::PaymentSessionCreated { attempt, result });
        });
    }

    fn spawn_verification(&self, attempt: AttemptId, proof: PaymentVerification) {
        let Some(credential) = self.credential.clone() else {
            return;
        };
        let orders = Arc::clone(&self.orders);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = orders.verify_payment(&credential, &proof).await;
            let _ = events.send(CheckoutEvent::PaymentVerified { attempt, result });
        });
    }

    fn arm_payment_timer(&mut self, attempt: AttemptId) {
        let Some(timeout) = self.payment_timeout else {
            return;
        };
        let events = self.events.clone();
        self.cancel_payment_timer();
        self.payment_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = events.send(CheckoutEvent::PaymentTimedOut { attempt });
        }));
    }

    fn cancel_payment_timer(&mut self) {
        if let Some(timer) = self.payment_timer.take() {
            timer.abort();
        }
    }

    fn close_pending_session(&self) {
        if let Some(session) = self.pending_payment() {
            self.gateway.close(&session.gateway_session_id);
        }
    }

    /// Log when the order service's total disagrees with the local quote.
    fn check_total(&self, order: &Order) {
        let Some(quoted) = self.quoted else {
            return;
        };
        if order.total != Decimal::ZERO && order.total != quoted.total {
            warn!(
                order_id = %order.id,
                quoted = %quoted.total,
                charged = %order.total,
                "Order total differs from cart quote"
            );
        }
    }

    fn settle(&mut self, order: Order) {
        self.cart.clear();
        self.end_attempt();
        info!(order_id = %order.id, order_number = %order.order_number, "Checkout settled");
        self.transition(CheckoutState::Settled { order });
    }

    fn fail(&mut self, failure: CheckoutFailure) -> CheckoutUpdate {
        self.end_attempt();
        self.transition(CheckoutState::Failed { failure });
        CheckoutUpdate::Applied
    }

    fn abort_for_reauthentication(&mut self) -> CheckoutUpdate {
        warn!(state = self.state.name(), "Credential rejected, checkout aborted");
        self.close_pending_session();
        self.end_attempt();
        self.reauthentication_required = true;
        self.transition(CheckoutState::Idle);
        CheckoutUpdate::ReauthenticationRequired
    }

    fn discard(&self, attempt: AttemptId, event: &str) -> CheckoutUpdate {
        debug!(attempt = %attempt, event, state = self.state.name(), "Discarding out-of-order event");
        CheckoutUpdate::Discarded
    }

    fn end_attempt(&mut self) {
        self.cancel_payment_timer();
        self.credential = None;
        self.quoted = None;
    }

    fn transition(&mut self, next: CheckoutState) {
        debug!(from = self.state.name(), to = next.name(), "Checkout transition");
        self.state = next;
    }
}

impl<O, G> Drop for CheckoutOrchestrator<O, G> {
    fn drop(&mut self) {
        if let Some(timer) = self.payment_timer.take() {
            timer.abort();
        }
    }
}
