//! Payment widget callback.
//!
//! The browser posts the widget's result here. The result is only accepted
//! for the gateway session the caller's own checkout is waiting on.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::gateway::{GatewayError, PaymentResult};
use crate::state::AppState;

/// Widget outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Success,
    Failure,
}

/// Callback body as posted by the browser.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub gateway_order_id: String,
    pub status: CallbackStatus,
    #[serde(default)]
    pub gateway_payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl PaymentCallback {
    fn into_result(self) -> Result<PaymentResult> {
        match self.status {
            CallbackStatus::Success => {
                let (Some(gateway_payment_id), Some(signature)) = (
                    self.gateway_payment_id.filter(|id| !id.is_empty()),
                    self.signature.filter(|sig| !sig.is_empty()),
                ) else {
                    return Err(AppError::BadRequest(
                        "Successful payments need gateway_payment_id and signature".to_string(),
                    ));
                };
                Ok(PaymentResult::Success {
                    gateway_order_id: self.gateway_order_id,
                    gateway_payment_id,
                    signature,
                })
            }
            CallbackStatus::Failure => Ok(PaymentResult::Failure {
                reason: self
                    .reason
                    .filter(|reason| !reason.trim().is_empty())
                    .unwrap_or_else(|| "Payment was not completed".to_string()),
            }),
        }
    }
}

/// Deliver a widget result to the shopper's checkout.
#[instrument(skip(state, session, callback), fields(gateway_order_id = %callback.gateway_order_id, status = ?callback.status))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Json(callback): Json<PaymentCallback>,
) -> Result<StatusCode> {
    let gateway_order_id = callback.gateway_order_id.clone();
    let result = callback.into_result()?;

    let checkout = state.checkout(&session).await?;
    {
        let checkout = checkout.lock().await;
        let pending = checkout
            .pending_payment()
            .map(|session| session.gateway_session_id.as_str());
        if pending != Some(gateway_order_id.as_str()) {
            return Err(GatewayError::UnknownSession(gateway_order_id).into());
        }
    }

    // The result comes back through the checkout's event pump, which needs
    // the lock released.
    state.gateway().complete(&gateway_order_id, result)?;

    add_breadcrumb(
        "payment",
        "Payment result received",
        Some(&[("gateway_order_id", gateway_order_id.as_str())]),
    );
    info!(gateway_order_id = %gateway_order_id, "Payment result delivered");

    Ok(StatusCode::ACCEPTED)
}
