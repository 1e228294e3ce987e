//! Cart mutation for guests and customers.
//!
//! A guest's cart lives in their storefront session and arrives with every
//! request; the mutated cart is returned for the storefront to store. A
//! customer's cart is persisted here and the snapshot they send is ignored.
//!
//! Prices are never taken from a snapshot: every line that is added, merged,
//! or charged picks up the product's current metadata.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use tienda_core::{Cart, CartItem, CartItemMetadata, CartMutationError, Product, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("only {available} units of product {product_id} in stock")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
    },

    #[error(transparent)]
    Mutation(#[from] CartMutationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart operations against the catalog and persisted carts.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The customer's persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the lookup fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, CartServiceError> {
        Ok(self.carts.get(user_id).await?)
    }

    /// Add units of a product to the customer's cart or the guest snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` for an unknown product,
    /// `CartServiceError::InsufficientStock` if the resulting line exceeds
    /// stock, or `CartServiceError::Mutation` for a zero quantity or a
    /// snapshot whose totals overflow.
    #[instrument(skip(self, snapshot))]
    pub async fn add(
        &self,
        user_id: Option<UserId>,
        snapshot: Cart,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(Cart, CartItem), CartServiceError> {
        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound(product_id))?;

        let mut cart = self.base_cart(user_id, snapshot).await?;
        let item = add_checked(&mut cart, &product, quantity)?;

        if let Some(user_id) = user_id {
            self.carts.save(user_id, &cart).await?;
        }
        Ok((cart, item))
    }

    /// Remove a product's whole line.
    ///
    /// Removing a product that is not in the cart leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading or saving fails, or
    /// `CartServiceError::Mutation` for a snapshot whose totals overflow.
    #[instrument(skip(self, snapshot))]
    pub async fn remove(
        &self,
        user_id: Option<UserId>,
        snapshot: Cart,
        product_id: ProductId,
    ) -> Result<Cart, CartServiceError> {
        let mut cart = self.base_cart(user_id, snapshot).await?;
        if cart.remove_item(product_id)?.is_some()
            && let Some(user_id) = user_id
        {
            self.carts.save(user_id, &cart).await?;
        }
        Ok(cart)
    }

    /// Merge a guest cart into the customer's persisted cart.
    ///
    /// Products that no longer exist are dropped from the merge.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading or saving fails.
    #[instrument(skip(self, guest))]
    pub async fn sync(&self, user_id: UserId, guest: &Cart) -> Result<Cart, CartServiceError> {
        let mut cart = self.carts.get(user_id).await?;
        if guest.is_empty() {
            return Ok(cart);
        }

        let catalog = self.catalog_for(guest).await?;
        let dropped = merge_into(&mut cart, guest, &catalog);
        if !dropped.is_empty() {
            tracing::info!(?dropped, "Dropped unknown products while merging guest cart");
        }

        self.carts.save(user_id, &cart).await?;
        Ok(cart)
    }

    /// Refresh every line with current catalog metadata.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::ProductNotFound` if a line's product is gone.
    pub async fn reprice(&self, cart: &Cart) -> Result<Cart, CartServiceError> {
        let catalog = self.catalog_for(cart).await?;
        reprice_with(cart, &catalog)
    }

    async fn base_cart(&self, user_id: Option<UserId>, snapshot: Cart) -> Result<Cart, CartServiceError> {
        match user_id {
            Some(user_id) => Ok(self.carts.get(user_id).await?),
            None => Ok(snapshot.normalized()?),
        }
    }

    async fn catalog_for(&self, cart: &Cart) -> Result<HashMap<ProductId, Product>, CartServiceError> {
        let ids: Vec<ProductId> = cart.cart_items.iter().map(|item| item.product_id).collect();
        let products = self.products.get_many(&ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}

// =============================================================================
// Cart arithmetic against the catalog
// =============================================================================

/// Add to `cart` only if the resulting line stays within stock.
fn add_checked(cart: &mut Cart, product: &Product, quantity: u32) -> Result<CartItem, CartServiceError> {
    let in_cart = cart.item(product.id).map_or(0, |item| item.quantity);
    if !product.has_stock_for(in_cart.saturating_add(quantity)) {
        return Err(CartServiceError::InsufficientStock {
            product_id: product.id,
            available: product.stock,
        });
    }
    Ok(cart.add_item(product.id, CartItemMetadata::from(product), quantity)?)
}

/// Add the guest's lines to `cart`, returning products that could not be merged.
///
/// A line is skipped when its product is missing from `catalog` or adding it
/// would overflow the cart.
fn merge_into(cart: &mut Cart, guest: &Cart, catalog: &HashMap<ProductId, Product>) -> Vec<ProductId> {
    let mut dropped = Vec::new();
    for item in &guest.cart_items {
        match catalog.get(&item.product_id) {
            Some(product) if item.quantity > 0 => {
                if let Err(e) =
                    cart.add_item(product.id, CartItemMetadata::from(product), item.quantity)
                {
                    tracing::warn!(
                        product_id = %product.id,
                        error = %e,
                        "Skipping guest line while merging"
                    );
                    dropped.push(product.id);
                }
            }
            Some(_) => {}
            None => dropped.push(item.product_id),
        }
    }
    dropped
}

fn reprice_with(cart: &Cart, catalog: &HashMap<ProductId, Product>) -> Result<Cart, CartServiceError> {
    let mut repriced = cart.clone();
    for item in &mut repriced.cart_items {
        let product = catalog
            .get(&item.product_id)
            .ok_or(CartServiceError::ProductNotFound(item.product_id))?;
        item.metadata = CartItemMetadata::from(product);
    }
    repriced.recalculate()?;
    Ok(repriced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i32, price: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("producto-{id}"),
            name: format!("Producto {id}"),
            description: String::new(),
            price: Decimal::new(price, 0),
            stock,
            image_url: None,
            category: None,
        }
    }

    fn catalog(products: &[Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn test_add_checked_respects_stock_across_adds() {
        let cafe = product(1, 4990, 3);
        let mut cart = Cart::empty();

        add_checked(&mut cart, &cafe, 2).unwrap();
        let err = add_checked(&mut cart, &cafe, 2).unwrap_err();
        assert!(matches!(
            err,
            CartServiceError::InsufficientStock { available: 3, .. }
        ));

        let line = add_checked(&mut cart, &cafe, 1).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(cart.quantity, 3);
        assert_eq!(cart.total, Decimal::new(14970, 0));
    }

    #[test]
    fn test_add_checked_rejects_zero() {
        let mut cart = Cart::empty();
        assert!(matches!(
            add_checked(&mut cart, &product(1, 100, 5), 0),
            Err(CartServiceError::Mutation(CartMutationError::ZeroQuantity))
        ));
    }

    #[test]
    fn test_merge_adds_quantities_and_drops_unknown_products() {
        let te = product(1, 3000, 10);
        let miel = product(2, 6500, 10);
        let mut persisted = Cart::empty();
        persisted
            .add_item(te.id, CartItemMetadata::from(&te), 1)
            .unwrap();

        let mut guest = Cart::empty();
        guest.add_item(te.id, CartItemMetadata::from(&te), 2).unwrap();
        guest
            .add_item(miel.id, CartItemMetadata::from(&miel), 1)
            .unwrap();
        guest
            .add_item(ProductId::new(99), CartItemMetadata::from(&product(99, 1, 1)), 1)
            .unwrap();

        let dropped = merge_into(&mut persisted, &guest, &catalog(&[te, miel]));

        assert_eq!(dropped, vec![ProductId::new(99)]);
        assert_eq!(persisted.item(ProductId::new(1)).unwrap().quantity, 3);
        assert_eq!(persisted.quantity, 4);
        assert_eq!(persisted.total, Decimal::new(15500, 0));
        assert!(persisted.is_consistent());
    }

    #[test]
    fn test_merge_skips_lines_that_would_overflow() {
        let te = product(1, 1, 10);
        let miel = product(2, 6500, 10);
        let mut persisted = Cart::empty();
        persisted
            .add_item(te.id, CartItemMetadata::from(&te), u32::MAX)
            .unwrap();

        let mut guest = Cart::empty();
        guest.add_item(te.id, CartItemMetadata::from(&te), 1).unwrap();
        guest
            .add_item(miel.id, CartItemMetadata::from(&miel), 1)
            .unwrap();

        let dropped = merge_into(&mut persisted, &guest, &catalog(&[te, miel]));

        assert_eq!(dropped, vec![ProductId::new(1), ProductId::new(2)]);
        assert_eq!(persisted.quantity, u32::MAX);
        assert!(persisted.is_consistent());
    }

    #[test]
    fn test_overflowing_snapshot_is_a_mutation_error() {
        let snapshot: Cart = serde_json::from_str(
            r#"{"cart_items":[{"product_id":1,"quantity":2,"metadata":{"name":"Té","slug":"te","unit_price":"79228162514264337593543950335"}}]}"#,
        )
        .unwrap();

        let err = CartServiceError::from(snapshot.normalized().unwrap_err());
        assert!(matches!(
            err,
            CartServiceError::Mutation(CartMutationError::Overflow)
        ));
    }

    #[test]
    fn test_reprice_uses_catalog_prices() {
        let mut cart = Cart::empty();
        let stale = product(1, 1000, 5);
        cart.add_item(stale.id, CartItemMetadata::from(&stale), 2)
            .unwrap();

        let current = product(1, 1500, 5);
        let repriced = reprice_with(&cart, &catalog(&[current])).unwrap();
        assert_eq!(repriced.total, Decimal::new(3000, 0));

        let missing = reprice_with(&cart, &HashMap::new()).unwrap_err();
        assert!(matches!(missing, CartServiceError::ProductNotFound(id) if id == ProductId::new(1)));
    }
}
