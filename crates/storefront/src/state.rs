//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use tower_sessions::Session;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::gateway::CallbackGateway;
use crate::orders::{HttpOrderService, OrderServiceError};
use crate::pricing::PricingCalculator;
use crate::sessions::{self, SessionRegistry, SharedCheckout};

/// How long a gateway session stays completable when no payment timeout is set.
const UNBOUNDED_GATEWAY_SESSION_TTL: Duration = Duration::from_secs(sessions::CHECKOUT_IDLE_SECONDS);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// order backend client, the payment gateway and the per-shopper checkouts.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    orders: Arc<HttpOrderService>,
    gateway: Arc<CallbackGateway>,
    sessions: SessionRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the order backend client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, OrderServiceError> {
        let orders = Arc::new(HttpOrderService::new(&config.order_service)?);
        let gateway = Arc::new(CallbackGateway::new(
            config
                .payment_timeout
                .unwrap_or(UNBOUNDED_GATEWAY_SESSION_TTL),
        ));
        let sessions = SessionRegistry::new(
            Arc::clone(&orders),
            Arc::clone(&gateway),
            PricingCalculator::new(config.pricing),
            config.payment_timeout,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                orders,
                gateway,
                sessions,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the order backend client.
    #[must_use]
    pub fn orders(&self) -> &HttpOrderService {
        &self.inner.orders
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &CallbackGateway {
        &self.inner.gateway
    }

    /// The checkout belonging to the browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn checkout(&self, session: &Session) -> Result<SharedCheckout, AppError> {
        let shopper = sessions::shopper_id(session).await?;
        let snapshot = sessions::cart_snapshot(session).await;
        Ok(self.inner.sessions.checkout(shopper, snapshot).await)
    }
}
