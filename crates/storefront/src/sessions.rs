//! Per-shopper checkout registry.
//!
//! Every browser session gets one [`StorefrontCheckout`], created on first
//! use and torn down after the same idle period as the session cookie. A
//! background task per checkout pumps its events into
//! [`CheckoutOrchestrator::handle`].
//!
//! The cart snapshot also lives in the browser session (see
//! [`keys::CART`]), so a shopper whose checkout was evicted gets their cart
//! back on the next request.

use std::sync::{Arc, Weak};
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cart::{CartState, CartStore};
use crate::checkout::{CheckoutEvents, CheckoutOrchestrator, CheckoutUpdate};
use crate::gateway::CallbackGateway;
use crate::orders::HttpOrderService;
use crate::pricing::PricingCalculator;

/// Checkout orchestrator as wired in the server.
pub type StorefrontCheckout = CheckoutOrchestrator<HttpOrderService, CallbackGateway>;

/// Checkout shared between request handlers and its event pump.
pub type SharedCheckout = Arc<Mutex<StorefrontCheckout>>;

/// Idle period after which a shopper's checkout is torn down (7 days).
pub const CHECKOUT_IDLE_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Maximum number of live checkouts.
const MAX_CHECKOUTS: u64 = 100_000;

/// Session keys.
pub mod keys {
    /// Stable ID for the shopper behind a browser session.
    pub const SHOPPER_ID: &str = "shopper_id";

    /// Persisted [`super::CartState`] snapshot.
    pub const CART: &str = "cart";
}

/// Registry of live checkouts keyed by shopper ID.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<SessionRegistryInner>,
}

struct SessionRegistryInner {
    checkouts: Cache<Uuid, SharedCheckout>,
    orders: Arc<HttpOrderService>,
    gateway: Arc<CallbackGateway>,
    pricing: PricingCalculator,
    payment_timeout: Option<Duration>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(
        orders: Arc<HttpOrderService>,
        gateway: Arc<CallbackGateway>,
        pricing: PricingCalculator,
        payment_timeout: Option<Duration>,
    ) -> Self {
        let checkouts = Cache::builder()
            .max_capacity(MAX_CHECKOUTS)
            .time_to_idle(Duration::from_secs(CHECKOUT_IDLE_SECONDS))
            .build();

        Self {
            inner: Arc::new(SessionRegistryInner {
                checkouts,
                orders,
                gateway,
                pricing,
                payment_timeout,
            }),
        }
    }

    /// The shopper's checkout, created (and its cart restored from
    /// `snapshot`) if there is none.
    pub async fn checkout(&self, shopper: Uuid, snapshot: Option<CartState>) -> SharedCheckout {
        self.inner
            .checkouts
            .get_with(shopper, async move { self.start(shopper, snapshot) })
            .await
    }

    /// Number of live checkouts.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.checkouts.entry_count()
    }

    /// Whether no checkouts are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start(&self, shopper: Uuid, snapshot: Option<CartState>) -> SharedCheckout {
        let cart = match snapshot.map(CartStore::restore) {
            Some(Ok(cart)) => cart,
            Some(Err(e)) => {
                warn!(shopper = %shopper, error = %e, "Discarding invalid cart snapshot");
                CartStore::new()
            }
            None => CartStore::new(),
        };

        let (orchestrator, events) = CheckoutOrchestrator::new(
            cart,
            self.inner.pricing,
            Arc::clone(&self.inner.orders),
            Arc::clone(&self.inner.gateway),
            self.inner.payment_timeout,
        );
        let checkout = Arc::new(Mutex::new(orchestrator));
        tokio::spawn(pump_events(shopper, Arc::downgrade(&checkout), events));

        debug!(shopper = %shopper, "Checkout started");
        checkout
    }
}

/// Feed a checkout's events back into it until it is dropped.
async fn pump_events(shopper: Uuid, checkout: Weak<Mutex<StorefrontCheckout>>, mut events: CheckoutEvents) {
    while let Some(event) = events.recv().await {
        let Some(checkout) = checkout.upgrade() else {
            break;
        };
        let update = checkout.lock().await.handle(event);
        if update == CheckoutUpdate::ReauthenticationRequired {
            debug!(shopper = %shopper, "Checkout waiting for re-authentication");
        }
    }
    debug!(shopper = %shopper, "Checkout event pump stopped");
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the shopper ID from the session, assigning one on first use.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn shopper_id(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(id) = session.get::<Uuid>(keys::SHOPPER_ID).await? {
        return Ok(id);
    }
    let id = Uuid::new_v4();
    session.insert(keys::SHOPPER_ID, id).await?;
    Ok(id)
}

/// Get the persisted cart snapshot, if any.
pub async fn cart_snapshot(session: &Session) -> Option<CartState> {
    session.get::<CartState>(keys::CART).await.ok().flatten()
}

/// Persist the cart snapshot.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(
    session: &Session,
    cart: &CartState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;
    use url::Url;

    use food_order_core::{MenuItemId, RestaurantId};

    use super::*;
    use crate::cart::{CartLine, CartRestaurant};
    use crate::config::OrderServiceConfig;

    fn registry() -> SessionRegistry {
        let orders = HttpOrderService::new(&OrderServiceConfig {
            base_url: Url::parse("http://127.0.0.1:9/api").unwrap(),
            timeout_secs: 1,
        })
        .unwrap();
        SessionRegistry::new(
            Arc::new(orders),
            Arc::new(CallbackGateway::new(Duration::from_secs(60))),
            PricingCalculator::default(),
            None,
        )
    }

    fn snapshot() -> CartState {
        CartState {
            restaurant: Some(CartRestaurant {
                id: RestaurantId::new(3),
                name: "Spice Route".to_string(),
            }),
            lines: vec![CartLine {
                menu_item_id: MenuItemId::new(11),
                name: "Masala Dosa".to_string(),
                unit_price: Decimal::from(100),
                quantity: 2,
                image_url: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_same_shopper_gets_same_checkout() {
        let registry = registry();
        let shopper = Uuid::new_v4();

        let first = registry.checkout(shopper, None).await;
        let second = registry.checkout(shopper, Some(snapshot())).await;

        assert!(Arc::ptr_eq(&first, &second));
        // The live cart wins over a snapshot once the checkout exists.
        assert!(second.lock().await.cart().is_empty());
    }

    #[tokio::test]
    async fn test_new_checkout_restores_snapshot() {
        let registry = registry();

        let checkout = registry.checkout(Uuid::new_v4(), Some(snapshot())).await;

        assert_eq!(checkout.lock().await.cart().item_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_snapshot_starts_empty() {
        let registry = registry();
        let mut broken = snapshot();
        broken.restaurant = None;

        let checkout = registry.checkout(Uuid::new_v4(), Some(broken)).await;

        assert!(checkout.lock().await.cart().is_empty());
    }
}
