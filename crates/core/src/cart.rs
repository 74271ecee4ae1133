//! Cart

use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors raised by cart mutations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantities added to the cart must be at least one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The resulting quantity for the line item does not fit in a `u32` (product id).
    #[error("quantity for product {0} exceeds the supported maximum")]
    QuantityOverflow(String),

    /// Unit prices cannot be negative (product id).
    #[error("price for product {0} cannot be negative")]
    NegativePrice(String),

    /// The cart total would no longer fit in a decimal (product id).
    #[error("cart total with product {0} exceeds the supported maximum")]
    TotalOverflow(String),
}

/// A product as offered to the cart, before it has a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    /// Product identifier
    pub id: String,

    /// Display label
    pub name: String,

    /// Unit price at the time of adding
    pub price: Decimal,

    /// Optional image, display only
    pub image: Option<String>,
}

impl CartProduct {
    /// Create a new product with no image.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: None,
        }
    }

    /// Attach a display image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// One row in the cart: a distinct product id and its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product identifier, unique per cart
    pub id: String,

    /// Display label
    pub name: String,

    /// Unit price at the time of adding
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Number of units, always positive while the row exists
    pub quantity: u32,

    /// Optional image, display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLineItem {
    /// Price multiplied by quantity, saturating at [`Decimal::MAX`].
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Price multiplied by quantity, or `None` on overflow.
    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Sum of line totals over `items`, or `None` if it overflows.
pub fn checked_subtotal(items: &[CartLineItem]) -> Option<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |total, item| {
        total.checked_add(item.checked_line_total()?)
    })
}

/// Ordered collection of line items keyed by product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartLineItem>,
    currency: &'static Currency,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(iso::USD)
    }
}

impl Cart {
    /// Create an empty cart priced in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            items: Vec::new(),
            currency,
        }
    }

    /// Build a cart from previously stored rows.
    ///
    /// Rows sharing an id are merged into the first occurrence and rows with a
    /// zero quantity are dropped. Merged quantities saturate at `u32::MAX`.
    /// Rows that would push the total past [`Decimal::MAX`] are dropped.
    pub fn from_items(
        items: impl IntoIterator<Item = CartLineItem>,
        currency: &'static Currency,
    ) -> Self {
        let mut cart = Self::new(currency);

        for item in items {
            if item.quantity == 0 {
                continue;
            }

            let kept = match cart.position(&item.id) {
                Some(index) => {
                    let merged = cart
                        .items
                        .get(index)
                        .map_or(item.quantity, |existing| {
                            existing.quantity.saturating_add(item.quantity)
                        });

                    cart.replace_quantity(index, merged)
                }
                None => cart.push_row(item.clone()),
            };

            if !kept {
                warn!(id = %item.id, "dropping stored cart row whose total overflows");
            }
        }

        cart
    }

    /// Add `quantity` units of a product.
    ///
    /// An existing row for the same id has its quantity increased and keeps
    /// the name and price it was first added with. Otherwise a new row is
    /// appended.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`]: `quantity` is zero.
    /// - [`CartError::NegativePrice`]: the product price is below zero.
    /// - [`CartError::QuantityOverflow`]: the merged quantity does not fit in a `u32`.
    /// - [`CartError::TotalOverflow`]: the cart total would overflow.
    pub fn add_item(&mut self, product: CartProduct, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if product.price < Decimal::ZERO {
            return Err(CartError::NegativePrice(product.id));
        }

        let kept = match self.position(&product.id) {
            Some(index) => {
                let merged = self
                    .items
                    .get(index)
                    .and_then(|existing| existing.quantity.checked_add(quantity))
                    .ok_or_else(|| CartError::QuantityOverflow(product.id.clone()))?;

                self.replace_quantity(index, merged)
            }
            None => self.push_row(CartLineItem {
                id: product.id.clone(),
                name: product.name,
                price: product.price,
                quantity,
                image: product.image,
            }),
        };

        if kept {
            Ok(())
        } else {
            Err(CartError::TotalOverflow(product.id))
        }
    }

    /// Remove the row for `id`, returning it if it was present.
    pub fn remove_item(&mut self, id: &str) -> Option<CartLineItem> {
        self.position(id).map(|index| self.items.remove(index))
    }

    /// Set the quantity of an existing row; zero removes it.
    ///
    /// Returns `Ok(false)` when there is no row for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::TotalOverflow`] if the cart total would overflow.
    /// The row keeps its quantity in that case.
    pub fn set_quantity(&mut self, id: &str, quantity: u32) -> Result<bool, CartError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        if quantity == 0 {
            self.items.remove(index);
        } else if !self.replace_quantity(index, quantity) {
            return Err(CartError::TotalOverflow(id.to_string()));
        }

        Ok(true)
    }

    /// Add one unit to an existing row.
    ///
    /// Returns `Ok(false)` when there is no row for `id`.
    ///
    /// # Errors
    ///
    /// - [`CartError::QuantityOverflow`]: the row is already at `u32::MAX`.
    /// - [`CartError::TotalOverflow`]: the cart total would overflow.
    pub fn increment(&mut self, id: &str) -> Result<bool, CartError> {
        let Some(current) = self.get(id).map(|item| item.quantity) else {
            return Ok(false);
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| CartError::QuantityOverflow(id.to_string()))?;

        self.set_quantity(id, next)
    }

    /// Take one unit away from an existing row, removing it at zero.
    ///
    /// Returns `false` when there is no row for `id`.
    pub fn decrement(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        let Some(item) = self.items.get_mut(index) else {
            return false;
        };

        if item.quantity > 1 {
            item.quantity -= 1;
        } else {
            self.items.remove(index);
        }

        true
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price × quantity over all rows.
    pub fn total(&self) -> Money<'static, Currency> {
        // Rows are only admitted while the sum fits.
        let amount = checked_subtotal(&self.items).unwrap_or(Decimal::MAX);

        Money::from_decimal(amount, self.currency)
    }

    /// Sum of quantities over all rows.
    pub fn count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Look up the row for `id`.
    pub fn get(&self, id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Rows in insertion order.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Iterate over rows in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartLineItem> {
        self.items.iter()
    }

    /// Number of distinct rows.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart has no rows.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Currency the cart is priced in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Set a row's quantity, restoring it if the total would overflow.
    fn replace_quantity(&mut self, index: usize, quantity: u32) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };

        let previous = std::mem::replace(&mut item.quantity, quantity);

        if checked_subtotal(&self.items).is_some() {
            return true;
        }

        if let Some(item) = self.items.get_mut(index) {
            item.quantity = previous;
        }

        false
    }

    /// Append a row, taking it back out if the total would overflow.
    fn push_row(&mut self, item: CartLineItem) -> bool {
        self.items.push(item);

        if checked_subtotal(&self.items).is_some() {
            return true;
        }

        self.items.pop();

        false
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLineItem;
    type IntoIter = std::slice::Iter<'a, CartLineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
