//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Health check
//!
//! # Cart
//! GET    /cart                      - Cart with pricing
//! POST   /cart/items                - Add one unit of a menu item
//! PUT    /cart/items/{menu_item_id} - Set quantity (zero removes)
//! DELETE /cart/items/{menu_item_id} - Remove line
//! DELETE /cart                      - Clear cart
//!
//! # Checkout
//! GET    /checkout                  - Current checkout state
//! POST   /checkout                  - Submit (requires bearer)
//! POST   /checkout/reset            - Abandon the current attempt
//!
//! # Payments
//! POST   /payments/callback         - Payment widget result
//!
//! # Orders (requires bearer)
//! GET    /orders                    - Order history
//! GET    /orders/{id}               - Order detail
//! ```

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payments;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{create_session_layer, login_redirect_middleware, request_id_middleware};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{menu_item_id}",
            put(cart::set_quantity).delete(cart::remove),
        )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/reset", post(checkout::reset))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/payments/callback", post(payments::callback))
        .nest("/orders", order_routes())
}

/// The storefront application with its session, redirect, request-id and
/// trace layers.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            login_redirect_middleware,
        ))
        .layer(session_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the order backend.
async fn health() -> &'static str {
    "ok"
}
