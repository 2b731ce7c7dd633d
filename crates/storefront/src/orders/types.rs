//! Wire types for the order backend.
//!
//! The backend speaks camelCase JSON; field names here follow it.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use food_order_core::{
    MenuItemId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, RestaurantId, UserId,
};

/// Field name → message, as reported by validation.
pub type FieldErrors = BTreeMap<String, String>;

/// Request body for creating an order.
///
/// Built from the cart and delivery details at submission time; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub restaurant_id: RestaurantId,
    pub items: Vec<OrderLineRequest>,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub delivery_instructions: String,
    pub payment_method: PaymentMethod,
}

/// One line of an [`OrderDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub special_instructions: String,
}

/// An order record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub restaurant_id: Option<RestaurantId>,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub delivery_fee: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_phone: Option<String>,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub order_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub estimated_delivery_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub actual_delivery_time: Option<NaiveDateTime>,
}

/// One line of an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub menu_item_id: Option<MenuItemId>,
    #[serde(default)]
    pub menu_item_name: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Gateway order created by the backend for an order (`POST /payments/create-order/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    /// Gateway-side order ID; identifies the payment session.
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    /// Public key the browser widget is opened with.
    pub key_id: String,
}

/// Signed proof of payment forwarded for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub order_id: OrderId,
    pub payment_method: PaymentMethod,
    #[serde(rename = "razorpayOrderId")]
    pub gateway_order_id: String,
    #[serde(rename = "razorpayPaymentId")]
    pub gateway_payment_id: String,
    #[serde(rename = "razorpaySignature")]
    pub signature: String,
}

/// Result of `POST /payments/verify`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl PaymentVerificationResponse {
    /// Whether the backend confirmed the payment.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed.as_str()
    }
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub field_errors: Option<FieldErrors>,
}
