//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store)
//! 5. Login redirect (`Location` on 401 responses)

pub mod auth;
pub mod reauth;
pub mod request_id;
pub mod session;

pub use auth::{Bearer, BearerRejection};
pub use reauth::login_redirect_middleware;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
