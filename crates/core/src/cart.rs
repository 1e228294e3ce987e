//! Cart model and arithmetic.
//!
//! The same [`Cart`] value is stored in a guest's session, persisted for
//! logged-in customers by the API, and sent over the wire between the two.
//! Its derived fields always satisfy:
//!
//! - `quantity` is the sum of every line's quantity
//! - `total` is the sum of every line's `unit_price * quantity`
//!
//! Every mutating method re-establishes both before returning. A cart whose
//! sums do not fit (`u32` units, [`Decimal`] pesos) is rejected with
//! [`CartMutationError::Overflow`] and left as it was.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{ProductId, format_clp};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartMutationError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("cart quantity or total out of range")]
    Overflow,
}

/// Product details copied into a cart line when it is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemMetadata {
    pub name: String,
    pub slug: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&Product> for CartItemMetadata {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            unit_price: product.price,
            image_url: product.image_url.clone(),
        }
    }
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub metadata: CartItemMetadata,
}

impl CartItem {
    /// `unit_price * quantity`, or `None` if it does not fit a [`Decimal`].
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.metadata
            .unit_price
            .checked_mul(Decimal::from(self.quantity))
    }
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Cart {
    pub cart_items: Vec<CartItem>,
    pub quantity: u32,
    pub total: Decimal,
}

impl Cart {
    /// The canonical empty cart: no lines, zero quantity, zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart_items.is_empty()
    }

    /// The line for `product_id`, if any.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.cart_items
            .iter()
            .find(|item| item.product_id == product_id)
    }

    /// Add `quantity` units of a product and return the resulting line.
    ///
    /// An existing line for the product has its quantity increased and its
    /// metadata refreshed (so the line picks up the current price).
    ///
    /// # Errors
    ///
    /// Returns [`CartMutationError::ZeroQuantity`] if `quantity` is 0, or
    /// [`CartMutationError::Overflow`] if the cart would no longer fit.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        metadata: CartItemMetadata,
        quantity: u32,
    ) -> Result<CartItem, CartMutationError> {
        if quantity == 0 {
            return Err(CartMutationError::ZeroQuantity);
        }

        let mut next = self.cart_items.clone();
        let line = if let Some(existing) = next
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CartMutationError::Overflow)?;
            existing.metadata = metadata;
            existing.clone()
        } else {
            let item = CartItem {
                product_id,
                quantity,
                metadata,
            };
            next.push(item.clone());
            item
        };

        *self = Self::from_items(next)?;
        Ok(line)
    }

    /// Remove the whole line for `product_id`, returning it if present.
    ///
    /// # Errors
    ///
    /// Returns [`CartMutationError::Overflow`] if the remaining lines do not
    /// fit.
    pub fn remove_item(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, CartMutationError> {
        let Some(position) = self
            .cart_items
            .iter()
            .position(|item| item.product_id == product_id)
        else {
            return Ok(None);
        };

        let mut next = self.cart_items.clone();
        let removed = next.remove(position);
        *self = Self::from_items(next)?;
        Ok(Some(removed))
    }

    /// Recompute `quantity` and `total` from the lines, dropping empty lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartMutationError::Overflow`] and leaves the cart untouched
    /// if either sum does not fit.
    pub fn recalculate(&mut self) -> Result<(), CartMutationError> {
        *self = Self::from_items(self.cart_items.clone())?;
        Ok(())
    }

    /// Consume the cart and return it with derived fields recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`CartMutationError::Overflow`] if either sum does not fit.
    pub fn normalized(self) -> Result<Self, CartMutationError> {
        Self::from_items(self.cart_items)
    }

    /// Whether the derived fields agree with the lines.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        sums(&self.cart_items)
            .is_some_and(|(quantity, total)| quantity == self.quantity && total == self.total)
    }

    /// `total` formatted for display.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_clp(self.total)
    }

    fn from_items(mut cart_items: Vec<CartItem>) -> Result<Self, CartMutationError> {
        cart_items.retain(|item| item.quantity > 0);
        let (quantity, total) = sums(&cart_items).ok_or(CartMutationError::Overflow)?;
        Ok(Self {
            cart_items,
            quantity,
            total,
        })
    }
}

/// Total units and total price of `items`, or `None` on overflow.
fn sums(items: &[CartItem]) -> Option<(u32, Decimal)> {
    items
        .iter()
        .try_fold((0u32, Decimal::ZERO), |(quantity, total), item| {
            Some((
                quantity.checked_add(item.quantity)?,
                total.checked_add(item.subtotal()?)?,
            ))
        })
}
