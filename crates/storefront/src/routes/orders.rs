//! Order tracking route handlers.
//!
//! Thin pass-through to the order backend with the shopper's bearer token.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use food_order_core::OrderId;

use crate::error::Result;
use crate::middleware::Bearer;
use crate::orders::{Order, OrderService};
use crate::state::AppState;

/// The shopper's orders.
#[instrument(skip(state, bearer))]
pub async fn list(State(state): State<AppState>, Bearer(bearer): Bearer) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().list_orders(&bearer).await?;
    Ok(Json(orders))
}

/// One of the shopper's orders.
#[instrument(skip(state, bearer))]
pub async fn show(
    State(state): State<AppState>,
    Bearer(bearer): Bearer,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state.orders().get_order(&bearer, order_id).await?;
    Ok(Json(order))
}
