//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use food_order_core::PaymentMethod;

use crate::checkout::{AttemptId, CheckoutFailure, CheckoutState, DeliveryDetails};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::Bearer;
use crate::sessions::{self, StorefrontCheckout};
use crate::state::AppState;

use super::cart::{PricingView, calculator};

/// Checkout as shown to the browser.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    #[serde(flatten)]
    pub state: CheckoutState,
    /// What to tell the shopper when the attempt failed.
    pub message: Option<String>,
    pub retryable: bool,
    /// Whether the shopper should contact support (money may have moved).
    pub requires_support: bool,
    pub pricing: Option<PricingView>,
}

impl CheckoutView {
    fn new(checkout: &StorefrontCheckout, state: &AppState) -> Self {
        let failure = match checkout.state() {
            CheckoutState::Failed { failure } => Some(failure),
            _ => None,
        };

        Self {
            state: checkout.state().clone(),
            message: failure.map(CheckoutFailure::user_message),
            retryable: failure.is_some_and(CheckoutFailure::is_retryable),
            requires_support: failure.is_some_and(CheckoutFailure::requires_support),
            pricing: calculator(state)
                .breakdown(checkout.cart().state())
                .map(PricingView::from),
        }
    }
}

/// Checkout submission body.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub delivery_address: String,
    pub delivery_phone: String,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Response to an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt: AttemptId,
    pub checkout: CheckoutView,
}

/// Current checkout state.
///
/// Answers 401 while the last attempt is waiting for the shopper to sign in
/// again.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutView>> {
    let checkout = state.checkout(&session).await?;
    let checkout = checkout.lock().await;

    if checkout.reauthentication_required() {
        return Err(AppError::Unauthorized(
            "credential expired during checkout".to_string(),
        ));
    }

    // Settlement clears the live cart; keep the snapshot in step.
    sessions::save_cart(&session, checkout.cart().state()).await?;
    Ok(Json(CheckoutView::new(&checkout, &state)))
}

/// Submit the cart.
///
/// The attempt continues in the background; poll [`show`] for the outcome.
#[instrument(skip(state, session, bearer, request), fields(payment_method = %request.payment_method))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Bearer(bearer): Bearer,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let details = DeliveryDetails {
        address: request.delivery_address,
        phone: request.delivery_phone,
        instructions: request.delivery_instructions,
    };

    let checkout = state.checkout(&session).await?;
    let mut checkout = checkout.lock().await;
    let attempt = checkout.submit(&details, request.payment_method, bearer)?;

    let attempt_id = attempt.to_string();
    add_breadcrumb(
        "checkout",
        "Submitted checkout",
        Some(&[
            ("attempt", attempt_id.as_str()),
            ("payment_method", request.payment_method.as_str()),
        ]),
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            attempt,
            checkout: CheckoutView::new(&checkout, &state),
        }),
    ))
}

/// Abandon the current attempt and return to idle.
///
/// Answers 409 once the payment is being verified.
#[instrument(skip(state, session))]
pub async fn reset(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutView>> {
    let checkout = state.checkout(&session).await?;
    let mut checkout = checkout.lock().await;
    checkout.reset()?;
    Ok(Json(CheckoutView::new(&checkout, &state)))
}
