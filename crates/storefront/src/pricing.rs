//! Cart pricing.
//!
//! The single place where cart totals are derived. Totals are never stored;
//! every view recomputes them from the current [`CartState`], so they cannot
//! drift from the cart contents.
//!
//! All arithmetic stays in exact decimal. Rounding is a display concern
//! (see [`food_order_core::Price::display`]). Sums saturate at
//! [`Decimal::MAX`] rather than overflow; the cart bounds keep real totals far
//! below it.

use rust_decimal::Decimal;
use serde::Serialize;

use food_order_core::{CurrencyCode, Price};

use crate::cart::{CartLine, CartState};

/// Flat delivery fee charged on every order (5.00).
pub const DEFAULT_DELIVERY_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

/// Tax rate applied to the subtotal (10%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Pricing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    /// Flat fee added to every non-empty cart.
    pub delivery_fee: Decimal,
    /// Fraction of the subtotal charged as tax (0.10 = 10%).
    pub tax_rate: Decimal,
    /// Currency the amounts are expressed in.
    pub currency: CurrencyCode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_fee: DEFAULT_DELIVERY_FEE,
            tax_rate: DEFAULT_TAX_RATE,
            currency: CurrencyCode::default(),
        }
    }
}

/// Derived totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingBreakdown {
    /// Σ unit price × quantity.
    pub subtotal: Decimal,
    /// Flat delivery fee.
    pub delivery_fee: Decimal,
    /// `subtotal × tax_rate`.
    pub tax: Decimal,
    /// `subtotal + delivery_fee + tax`.
    pub total: Decimal,
    /// Currency of every amount above.
    pub currency: CurrencyCode,
}

impl PricingBreakdown {
    /// The total as a [`Price`].
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::new(self.total, self.currency)
    }
}

/// Pure calculator from cart contents to [`PricingBreakdown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    /// Create a calculator with the given constants.
    #[must_use]
    pub const fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// The constants this calculator applies.
    #[must_use]
    pub const fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price a cart.
    ///
    /// Returns `None` for an empty cart: there is nothing to deliver, so the
    /// delivery fee is meaningless and callers skip the pricing view.
    #[must_use]
    pub fn breakdown(&self, cart: &CartState) -> Option<PricingBreakdown> {
        if cart.lines.is_empty() {
            return None;
        }

        let subtotal = subtotal(&cart.lines);
        let tax = subtotal.saturating_mul(self.config.tax_rate);
        let delivery_fee = self.config.delivery_fee;

        Some(PricingBreakdown {
            subtotal,
            delivery_fee,
            tax,
            total: subtotal.saturating_add(delivery_fee).saturating_add(tax),
            currency: self.config.currency,
        })
    }
}

/// Sum of line totals.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(CartLine::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}
