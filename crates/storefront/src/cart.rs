//! Cart store.
//!
//! [`CartStore`] is the sole owner of a shopper's [`CartState`]. Every read
//! goes through it and it is mutated only through [`CartStore::add_item`],
//! [`CartStore::set_quantity`], [`CartStore::remove_item`] and
//! [`CartStore::clear`].
//!
//! # Invariants
//!
//! - All lines belong to the cart's restaurant. Adding an item from another
//!   restaurant discards the existing lines first (cart replacement).
//! - A line never holds quantity zero; setting zero removes it.
//! - A line never holds more than [`MAX_LINE_QUANTITY`] units.
//! - Menu item IDs are unique within the cart.
//! - An empty cart has no restaurant.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use food_order_core::{MenuItemId, RestaurantId};

/// Most units of one menu item a line can hold. Larger requests are clamped.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Highest unit price accepted into a cart (1,000,000).
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Errors raised when restoring a persisted cart snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The snapshot has lines but no restaurant.
    #[error("cart has lines but no restaurant")]
    MissingRestaurant,
    /// The snapshot has a restaurant but no lines.
    #[error("empty cart must not reference a restaurant")]
    DanglingRestaurant,
    /// A line was persisted with quantity zero.
    #[error("line for menu item {0} has zero quantity")]
    ZeroQuantity(MenuItemId),
    /// A line was persisted with a negative unit price.
    #[error("line for menu item {0} has a negative price")]
    NegativePrice(MenuItemId),
    /// A line was persisted above [`MAX_LINE_QUANTITY`].
    #[error("line for menu item {0} exceeds the quantity limit")]
    QuantityTooLarge(MenuItemId),
    /// A line was persisted above [`MAX_UNIT_PRICE`].
    #[error("line for menu item {0} exceeds the price limit")]
    PriceTooLarge(MenuItemId),
    /// The same menu item appears on more than one line.
    #[error("menu item {0} appears more than once")]
    DuplicateLine(MenuItemId),
}

/// A menu item as offered by a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Menu item ID.
    pub id: MenuItemId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Image reference, if the item has one.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// The restaurant that owns the cart's lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRestaurant {
    /// Restaurant ID.
    pub id: RestaurantId,
    /// Display name.
    pub name: String,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Menu item this line is for.
    pub menu_item_id: MenuItemId,
    /// Item name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    pub unit_price: Decimal,
    /// Always at least 1.
    pub quantity: u32,
    /// Image reference, if the item has one.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartLine {
    /// Price of the whole line (`unit_price × quantity`).
    ///
    /// Saturates at [`Decimal::MAX`] instead of overflowing.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Snapshot of a cart's contents.
///
/// This is the persisted form; use [`CartStore::restore`] to turn it back
/// into a store so the invariants are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    /// Owning restaurant; `None` exactly when `lines` is empty.
    pub restaurant: Option<CartRestaurant>,
    /// Lines in insertion order.
    pub lines: Vec<CartLine>,
}

/// What an [`CartStore::add_item`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was inserted.
    Added,
    /// An existing line's quantity went up by one.
    Incremented,
    /// The cart held another restaurant's lines; they were discarded and
    /// the new line inserted.
    Replaced {
        /// Restaurant whose lines were discarded.
        previous: RestaurantId,
    },
}

/// Owner of a shopper's cart contents.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    state: CartState,
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from a persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the snapshot violates any cart invariant.
    pub fn restore(state: CartState) -> Result<Self, CartError> {
        match (&state.restaurant, state.lines.is_empty()) {
            (None, false) => return Err(CartError::MissingRestaurant),
            (Some(_), true) => return Err(CartError::DanglingRestaurant),
            _ => {}
        }

        let mut seen = HashSet::with_capacity(state.lines.len());
        for line in &state.lines {
            if line.quantity == 0 {
                return Err(CartError::ZeroQuantity(line.menu_item_id));
            }
            if line.quantity > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityTooLarge(line.menu_item_id));
            }
            if line.unit_price.is_sign_negative() {
                return Err(CartError::NegativePrice(line.menu_item_id));
            }
            if line.unit_price > MAX_UNIT_PRICE {
                return Err(CartError::PriceTooLarge(line.menu_item_id));
            }
            if !seen.insert(line.menu_item_id) {
                return Err(CartError::DuplicateLine(line.menu_item_id));
            }
        }

        Ok(Self { state })
    }

    /// Current contents.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.state.lines
    }

    /// The restaurant that owns the cart, if any.
    #[must_use]
    pub const fn restaurant(&self) -> Option<&CartRestaurant> {
        self.state.restaurant.as_ref()
    }

    /// The owning restaurant's ID, if any.
    #[must_use]
    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.state.restaurant.as_ref().map(|r| r.id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state
            .lines
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Add one unit of `item` from `restaurant`.
    ///
    /// If the cart belongs to a different restaurant, its lines are discarded
    /// first. An existing line for the item is incremented by one, up to
    /// [`MAX_LINE_QUANTITY`]; otherwise a new line is inserted with quantity 1.
    pub fn add_item(&mut self, item: &MenuItem, restaurant: &CartRestaurant) -> CartChange {
        let current = self.restaurant_id();
        let replaced = current.filter(|id| *id != restaurant.id);

        if let Some(previous) = replaced {
            info!(
                previous = %previous,
                restaurant = %restaurant.id,
                discarded_lines = self.state.lines.len(),
                "Replacing cart with another restaurant's items"
            );
            self.state.lines.clear();
        }
        if current.is_none() || replaced.is_some() {
            self.state.restaurant = Some(restaurant.clone());
        }

        if let Some(line) = self
            .state
            .lines
            .iter_mut()
            .find(|line| line.menu_item_id == item.id)
        {
            line.quantity = line.quantity.saturating_add(1).min(MAX_LINE_QUANTITY);
            debug!(menu_item = %item.id, quantity = line.quantity, "Incremented cart line");
            return replaced.map_or(CartChange::Incremented, |previous| CartChange::Replaced {
                previous,
            });
        }

        self.state.lines.push(CartLine {
            menu_item_id: item.id,
            name: item.name.clone(),
            unit_price: item.price,
            quantity: 1,
            image_url: item.image_url.clone(),
        });
        debug!(menu_item = %item.id, "Added cart line");

        replaced.map_or(CartChange::Added, |previous| CartChange::Replaced { previous })
    }

    /// Set the quantity of an existing line exactly.
    ///
    /// A quantity of zero or less removes the line; anything above
    /// [`MAX_LINE_QUANTITY`] is clamped to it. Unknown menu items are ignored.
    pub fn set_quantity(&mut self, menu_item_id: MenuItemId, quantity: i64) {
        let Some(index) = self
            .state
            .lines
            .iter()
            .position(|line| line.menu_item_id == menu_item_id)
        else {
            debug!(menu_item = %menu_item_id, "Quantity change for item not in cart ignored");
            return;
        };

        if quantity <= 0 {
            self.state.lines.remove(index);
            debug!(menu_item = %menu_item_id, "Removed cart line");
        } else if let Some(line) = self.state.lines.get_mut(index) {
            line.quantity = u32::try_from(quantity)
                .unwrap_or(MAX_LINE_QUANTITY)
                .min(MAX_LINE_QUANTITY);
        }

        self.release_restaurant_if_empty();
    }

    /// Remove a line. Same as `set_quantity(menu_item_id, 0)`.
    pub fn remove_item(&mut self, menu_item_id: MenuItemId) {
        self.set_quantity(menu_item_id, 0);
    }

    /// Empty the cart and forget its restaurant.
    pub fn clear(&mut self) {
        if self.state.restaurant.is_some() || !self.state.lines.is_empty() {
            debug!("Cleared cart");
        }
        self.state = CartState::default();
    }

    fn release_restaurant_if_empty(&mut self) {
        if self.state.lines.is_empty() {
            self.state.restaurant = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn restaurant(id: i64) -> CartRestaurant {
        CartRestaurant {
            id: RestaurantId::new(id),
            name: format!("Restaurant {id}"),
        }
    }

    fn item(id: i64, price: i64) -> MenuItem {
        MenuItem {
            id: MenuItemId::new(id),
            name: format!("Item {id}"),
            price: Decimal::from(price),
            image_url: None,
        }
    }

    #[test]
    fn test_add_inserts_then_increments() {
        let mut cart = CartStore::new();
        let r = restaurant(1);

        assert_eq!(cart.add_item(&item(10, 100), &r), CartChange::Added);
        assert_eq!(cart.add_item(&item(10, 100), &r), CartChange::Incremented);
        assert_eq!(cart.add_item(&item(11, 50), &r), CartChange::Added);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.restaurant_id(), Some(RestaurantId::new(1)));
    }

    #[test]
    fn test_add_from_other_restaurant_replaces_cart() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));
        cart.add_item(&item(11, 60), &restaurant(1));

        let change = cart.add_item(&item(20, 30), &restaurant(2));

        assert_eq!(
            change,
            CartChange::Replaced {
                previous: RestaurantId::new(1)
            }
        );
        assert_eq!(cart.restaurant_id(), Some(RestaurantId::new(2)));
        assert_eq!(cart.restaurant().map(|r| r.name.as_str()), Some("Restaurant 2"));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].menu_item_id, MenuItemId::new(20));
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_set_quantity_sets_exactly() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));

        cart.set_quantity(MenuItemId::new(10), 5);
        assert_eq!(cart.lines()[0].quantity, 5);

        cart.set_quantity(MenuItemId::new(10), 2);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_quantity_is_clamped_to_line_limit() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));

        cart.set_quantity(MenuItemId::new(10), i64::MAX);
        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);

        assert_eq!(cart.add_item(&item(10, 100), &restaurant(1)), CartChange::Incremented);
        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);
        assert_eq!(cart.lines()[0].line_total(), Decimal::from(99_900));
    }

    #[test]
    fn test_line_total_saturates() {
        let line = CartLine {
            menu_item_id: MenuItemId::new(1),
            name: "Saffron".to_string(),
            unit_price: Decimal::MAX,
            quantity: 2,
            image_url: None,
        };
        assert_eq!(line.line_total(), Decimal::MAX);
    }

    #[test]
    fn test_set_quantity_zero_matches_remove() {
        let mut via_zero = CartStore::new();
        let mut via_remove = CartStore::new();
        for cart in [&mut via_zero, &mut via_remove] {
            cart.add_item(&item(10, 100), &restaurant(1));
            cart.add_item(&item(11, 40), &restaurant(1));
        }

        via_zero.set_quantity(MenuItemId::new(10), 0);
        via_remove.remove_item(MenuItemId::new(10));

        assert_eq!(via_zero.state(), via_remove.state());
        assert_eq!(via_zero.lines().len(), 1);
    }

    #[test]
    fn test_negative_quantity_removes_line() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));
        cart.set_quantity(MenuItemId::new(10), -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_removing_last_line_releases_restaurant() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));

        cart.remove_item(MenuItemId::new(10));

        assert!(cart.is_empty());
        assert_eq!(cart.restaurant_id(), None);
    }

    #[test]
    fn test_set_quantity_unknown_item_is_noop() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));
        let before = cart.state().clone();

        cart.set_quantity(MenuItemId::new(99), 4);

        assert_eq!(cart.state(), &before);
    }

    #[test]
    fn test_clear_twice_is_noop() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));

        cart.clear();
        let after_first = cart.state().clone();
        cart.clear();

        assert_eq!(cart.state(), &after_first);
        assert_eq!(after_first, CartState::default());
    }

    #[test]
    fn test_restore_accepts_valid_snapshot() {
        let mut cart = CartStore::new();
        cart.add_item(&item(10, 100), &restaurant(1));
        cart.add_item(&item(10, 100), &restaurant(1));

        let restored = CartStore::restore(cart.state().clone()).expect("valid snapshot");
        assert_eq!(restored.state(), cart.state());
    }

    #[test]
    fn test_restore_rejects_broken_snapshots() {
        let line = CartLine {
            menu_item_id: MenuItemId::new(1),
            name: "Dosa".to_string(),
            unit_price: Decimal::from(80),
            quantity: 1,
            image_url: None,
        };

        let orphan = CartState {
            restaurant: None,
            lines: vec![line.clone()],
        };
        assert_eq!(
            CartStore::restore(orphan).unwrap_err(),
            CartError::MissingRestaurant
        );

        let dangling = CartState {
            restaurant: Some(restaurant(1)),
            lines: vec![],
        };
        assert_eq!(
            CartStore::restore(dangling).unwrap_err(),
            CartError::DanglingRestaurant
        );

        let zero = CartState {
            restaurant: Some(restaurant(1)),
            lines: vec![CartLine {
                quantity: 0,
                ..line.clone()
            }],
        };
        assert_eq!(
            CartStore::restore(zero).unwrap_err(),
            CartError::ZeroQuantity(MenuItemId::new(1))
        );

        let oversized = CartState {
            restaurant: Some(restaurant(1)),
            lines: vec![CartLine {
                quantity: u32::MAX,
                ..line.clone()
            }],
        };
        assert_eq!(
            CartStore::restore(oversized).unwrap_err(),
            CartError::QuantityTooLarge(MenuItemId::new(1))
        );

        let overpriced = CartState {
            restaurant: Some(restaurant(1)),
            lines: vec![CartLine {
                unit_price: Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
                ..line.clone()
            }],
        };
        assert_eq!(
            CartStore::restore(overpriced).unwrap_err(),
            CartError::PriceTooLarge(MenuItemId::new(1))
        );

        let duplicate = CartState {
            restaurant: Some(restaurant(1)),
            lines: vec![line.clone(), line],
        };
        assert_eq!(
            CartStore::restore(duplicate).unwrap_err(),
            CartError::DuplicateLine(MenuItemId::new(1))
        );
    }
}
