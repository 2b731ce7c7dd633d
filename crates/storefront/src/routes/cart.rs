//! Cart route handlers.
//!
//! The cart lives in the shopper's checkout; every mutation also writes the
//! cart snapshot into the browser session.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use food_order_core::{MenuItemId, RestaurantId};

use crate::cart::{CartChange, CartLine, CartRestaurant, CartStore, MAX_UNIT_PRICE, MenuItem};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::pricing::{PricingBreakdown, PricingCalculator};
use crate::sessions;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Cart line as shown to the browser.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub image_url: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            menu_item_id: line.menu_item_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
            image_url: line.image_url.clone(),
        }
    }
}

/// Pricing as shown to the browser.
#[derive(Debug, Serialize)]
pub struct PricingView {
    #[serde(flatten)]
    pub breakdown: PricingBreakdown,
    /// Total formatted for display, e.g. `₹225.00`.
    pub total_display: String,
}

impl From<PricingBreakdown> for PricingView {
    fn from(breakdown: PricingBreakdown) -> Self {
        Self {
            total_display: breakdown.total_price().display(),
            breakdown,
        }
    }
}

/// Cart as shown to the browser.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub restaurant: Option<CartRestaurant>,
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    /// `None` for an empty cart.
    pub pricing: Option<PricingView>,
}

impl CartView {
    /// Build the view for a cart.
    #[must_use]
    pub fn new(cart: &CartStore, pricing: &PricingCalculator) -> Self {
        Self {
            restaurant: cart.restaurant().cloned(),
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            pricing: pricing.breakdown(cart.state()).map(PricingView::from),
        }
    }
}

/// Response to adding an item.
#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    /// `added`, `incremented` or `replaced`.
    pub change: &'static str,
    /// Restaurant whose lines were discarded, when `change` is `replaced`.
    pub replaced_restaurant_id: Option<RestaurantId>,
    pub cart: CartView,
}

// =============================================================================
// Requests
// =============================================================================

/// Menu item as posted by the browser.
#[derive(Debug, Deserialize)]
pub struct MenuItemInput {
    pub id: MenuItemId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub menu_item: MenuItemInput,
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let checkout = state.checkout(&session).await?;
    let checkout = checkout.lock().await;
    sessions::save_cart(&session, checkout.cart().state()).await?;
    Ok(Json(CartView::new(checkout.cart(), &calculator(&state))))
}

/// Add one unit of a menu item.
#[instrument(skip(state, session, request), fields(menu_item_id = %request.menu_item.id, restaurant_id = %request.restaurant_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<AddItemResponse>> {
    if request.menu_item.price.is_sign_negative() {
        return Err(AppError::BadRequest(
            "Menu item price must not be negative".to_string(),
        ));
    }
    if request.menu_item.price > MAX_UNIT_PRICE {
        return Err(AppError::BadRequest(format!(
            "Menu item price must not exceed {MAX_UNIT_PRICE}"
        )));
    }
    if request.menu_item.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Menu item name is required".to_string(),
        ));
    }

    let item = MenuItem {
        id: request.menu_item.id,
        name: request.menu_item.name,
        price: request.menu_item.price,
        image_url: request.menu_item.image_url,
    };
    let restaurant = CartRestaurant {
        id: request.restaurant_id,
        name: request.restaurant_name,
    };

    let checkout = state.checkout(&session).await?;
    let mut checkout = checkout.lock().await;
    let change = checkout.cart_mut()?.add_item(&item, &restaurant);
    sessions::save_cart(&session, checkout.cart().state()).await?;

    let item_id = item.id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("menu_item_id", item_id.as_str())]));

    let (change, replaced_restaurant_id) = match change {
        CartChange::Added => ("added", None),
        CartChange::Incremented => ("incremented", None),
        CartChange::Replaced { previous } => ("replaced", Some(previous)),
    };

    Ok(Json(AddItemResponse {
        change,
        replaced_restaurant_id,
        cart: CartView::new(checkout.cart(), &calculator(&state)),
    }))
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(state, session, request), fields(quantity = request.quantity))]
pub async fn set_quantity(
    State(state): State<AppState>,
    session: Session,
    Path(menu_item_id): Path<MenuItemId>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<CartView>> {
    let checkout = state.checkout(&session).await?;
    let mut checkout = checkout.lock().await;
    checkout
        .cart_mut()?
        .set_quantity(menu_item_id, request.quantity);
    sessions::save_cart(&session, checkout.cart().state()).await?;
    Ok(Json(CartView::new(checkout.cart(), &calculator(&state))))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(menu_item_id): Path<MenuItemId>,
) -> Result<Json<CartView>> {
    let checkout = state.checkout(&session).await?;
    let mut checkout = checkout.lock().await;
    checkout.cart_mut()?.remove_item(menu_item_id);
    sessions::save_cart(&session, checkout.cart().state()).await?;
    Ok(Json(CartView::new(checkout.cart(), &calculator(&state))))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let checkout = state.checkout(&session).await?;
    let mut checkout = checkout.lock().await;
    checkout.cart_mut()?.clear();
    sessions::save_cart(&session, checkout.cart().state()).await?;
    Ok(Json(CartView::new(checkout.cart(), &calculator(&state))))
}

pub(super) fn calculator(state: &AppState) -> PricingCalculator {
    PricingCalculator::new(state.config().pricing)
}
