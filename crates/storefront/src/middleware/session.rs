//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. Sessions hold only the
//! shopper ID and the cart snapshot; everything else lives in the checkout
//! registry.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::sessions::CHECKOUT_IDLE_SECONDS;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "food_order_session";

/// Create the session layer with an in-memory store.
///
/// The cookie expires after the same idle period as the shopper's checkout.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    let expiry_seconds = i64::try_from(CHECKOUT_IDLE_SECONDS).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(expiry_seconds),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
