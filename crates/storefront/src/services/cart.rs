//! Cart reconciliation.
//!
//! Guests and customers see the same [`Cart`], but it lives in different
//! places: a guest's cart is kept in their session, a customer's cart is
//! persisted by the API. [`CartReconciler`] picks the right source for every
//! operation:
//!
//! | operation | guest | customer |
//! |---|---|---|
//! | load | session store | `GET /cart/` |
//! | add / remove | API with the session snapshot, result written back | API, persisted server side |
//! | login | - | guest cart merged via `POST /cart/sync-cart`, session store cleared |
//! | logout | session store cleared | - |
//!
//! Mutations are always computed by the API so prices and stock come from
//! one place. Failures propagate. A guest cart still in the session after a
//! failed login merge is merged again on the customer's next load.

use async_trait::async_trait;

use tienda_core::wire::{AddToCartRequest, AddToCartResponse, RemoveFromCartRequest};
use tienda_core::{Cart, CartItem, CartMutationError, ProductId};

use super::cart_store::{CartStore, CartStoreError};
use super::notifier::{CartAction, CartChanged, CartNotifier};
use super::session_auth::SessionAuth;
use crate::api::{ApiClient, ApiError};
use crate::models::AccessToken;

/// Errors from cart operations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("cart backend error: {0}")]
    Backend(#[from] ApiError),

    #[error("cart store error: {0}")]
    Store(#[from] CartStoreError),

    #[error("unusable cart from backend: {0}")]
    Invalid(#[from] CartMutationError),
}

/// The persistence service's cart endpoints.
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn fetch_cart(&self, token: &AccessToken) -> Result<Cart, ApiError>;

    async fn add_to_cart(
        &self,
        token: Option<&AccessToken>,
        request: &AddToCartRequest,
    ) -> Result<AddToCartResponse, ApiError>;

    async fn remove_from_cart(
        &self,
        token: Option<&AccessToken>,
        request: &RemoveFromCartRequest,
    ) -> Result<Cart, ApiError>;

    async fn sync_cart(&self, token: &AccessToken, cart: &Cart) -> Result<Cart, ApiError>;
}

#[async_trait]
impl CartBackend for ApiClient {
    async fn fetch_cart(&self, token: &AccessToken) -> Result<Cart, ApiError> {
        self.get_cart(token).await
    }

    async fn add_to_cart(
        &self,
        token: Option<&AccessToken>,
        request: &AddToCartRequest,
    ) -> Result<AddToCartResponse, ApiError> {
        Self::add_to_cart(self, token, request).await
    }

    async fn remove_from_cart(
        &self,
        token: Option<&AccessToken>,
        request: &RemoveFromCartRequest,
    ) -> Result<Cart, ApiError> {
        Self::remove_from_cart(self, token, request).await
    }

    async fn sync_cart(&self, token: &AccessToken, cart: &Cart) -> Result<Cart, ApiError> {
        Self::sync_cart(self, token, cart).await
    }
}

/// Single cart view over the guest store and the persisted cart.
pub struct CartReconciler<'a> {
    store: &'a dyn CartStore,
    auth: &'a dyn SessionAuth,
    backend: &'a dyn CartBackend,
    notifier: &'a CartNotifier,
}

impl<'a> CartReconciler<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn CartStore,
        auth: &'a dyn SessionAuth,
        backend: &'a dyn CartBackend,
        notifier: &'a CartNotifier,
    ) -> Self {
        Self {
            store,
            auth,
            backend,
            notifier,
        }
    }

    /// Token of an authenticated visitor, `None` for guests.
    async fn authenticated_token(&self) -> Option<AccessToken> {
        if self.auth.is_authenticated().await {
            self.auth.access_token().await
        } else {
            None
        }
    }

    /// The visitor's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted cart cannot be fetched or a pending
    /// guest cart cannot be merged.
    pub async fn load(&self) -> Result<Cart, CartError> {
        let Some(token) = self.authenticated_token().await else {
            return Ok(self.store.read().await);
        };

        if !self.store.read().await.is_empty() {
            tracing::info!("Merging guest cart left over from login");
            return self.sync_after_login(&token).await;
        }

        Ok(self.backend.fetch_cart(&token).await?.normalized()?)
    }

    /// Add `quantity` units of a product.
    ///
    /// Returns the updated cart and the affected line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the add or the guest cart cannot
    /// be saved.
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(Cart, CartItem), CartError> {
        let token = self.authenticated_token().await;
        let request = AddToCartRequest {
            cart: self.store.read().await,
            product_id,
            quantity,
        };

        let response = self.backend.add_to_cart(token.as_ref(), &request).await?;
        let cart = response.cart.normalized()?;
        self.commit(token.as_ref(), &cart, CartAction::Added).await?;

        Ok((cart, response.item))
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the removal or the guest cart
    /// cannot be saved.
    pub async fn remove_item(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let token = self.authenticated_token().await;
        let request = RemoveFromCartRequest {
            cart: self.store.read().await,
            product_id,
        };

        let cart = self
            .backend
            .remove_from_cart(token.as_ref(), &request)
            .await?
            .normalized()?;
        self.commit(token.as_ref(), &cart, CartAction::Removed).await?;

        Ok(cart)
    }

    /// Merge the guest cart into the customer's persisted cart after login.
    ///
    /// The guest store is cleared afterwards so the persisted cart is the
    /// only source of truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge fails; the guest cart is left intact.
    pub async fn sync_after_login(&self, token: &AccessToken) -> Result<Cart, CartError> {
        let guest = self.store.read().await;
        if guest.is_empty() {
            self.store.clear().await?;
            return Ok(self.backend.fetch_cart(token).await?.normalized()?);
        }

        let cart = self.backend.sync_cart(token, &guest).await?.normalized()?;
        self.store.clear().await?;
        self.notifier
            .publish(CartChanged::new(CartAction::Synced, &cart));

        Ok(cart)
    }

    /// Drop the guest cart (logout, completed payment).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub async fn forget_local(&self) -> Result<(), CartError> {
        self.store.clear().await?;
        self.notifier
            .publish(CartChanged::new(CartAction::Cleared, &Cart::empty()));
        Ok(())
    }

    async fn commit(
        &self,
        token: Option<&AccessToken>,
        cart: &Cart,
        action: CartAction,
    ) -> Result<(), CartError> {
        if token.is_none() {
            self.store.write(cart).await?;
        }
        self.notifier.publish(CartChanged::new(action, cart));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::services::cart_store::MemoryCartStore;
    use crate::services::fakes::{FakeAuth, FakeBackend};

    #[tokio::test]
    async fn test_guest_add_writes_back_and_notifies() {
        let store = MemoryCartStore::new();
        let auth = FakeAuth::guest();
        let backend = FakeBackend::new();
        let notifier = CartNotifier::new();
        let mut observer = notifier.subscribe();
        let carts = CartReconciler::new(&store, &auth, &backend, &notifier);

        let (cart, item) = carts.add_item(ProductId::new(1), 2).await.unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(cart.quantity, 2);

        let (cart, _) = carts.add_item(ProductId::new(2), 1).await.unwrap();
        assert_eq!(cart.quantity, 3);
        assert!(cart.is_consistent());

        // Guest state survives a reload
        assert_eq!(store.read().await, cart);

        let event = observer.recv().await.unwrap();
        assert_eq!(event.action, CartAction::Added);
        assert_eq!(event.quantity, 2);
    }

    #[tokio::test]
    async fn test_guest_remove() {
        let store = MemoryCartStore::new();
        let auth = FakeAuth::guest();
        let backend = FakeBackend::new();
        let notifier = CartNotifier::new();
        let carts = CartReconciler::new(&store, &auth, &backend, &notifier);

        carts.add_item(ProductId::new(1), 2).await.unwrap();
        carts.add_item(ProductId::new(2), 1).await.unwrap();
        let cart = carts.remove_item(ProductId::new(1)).await.unwrap();

        assert_eq!(cart.quantity, 1);
        assert_eq!(cart.total, Decimal::new(1_000, 0));
        assert_eq!(store.read().await, cart);
    }

    #[tokio::test]
    async fn test_authenticated_load_uses_persisted_cart() {
        let store = MemoryCartStore::with_raw("garbage");
        let auth = FakeAuth::customer();
        let backend = FakeBackend::new();
        backend.seed_persisted(ProductId::new(3), 4);
        let notifier = CartNotifier::new();
        let carts = CartReconciler::new(&store, &auth, &backend, &notifier);

        let cart = carts.load().await.unwrap();
        assert_eq!(cart.quantity, 4);
        assert_eq!(backend.calls(), vec!["fetch_cart"]);
    }

    #[tokio::test]
    async fn test_authenticated_add_does_not_touch_guest_store() {
        let store = MemoryCartStore::new();
        let auth = FakeAuth::customer();
        let backend = FakeBackend::new();
        let notifier = CartNotifier::new();
        let carts = CartReconciler::new(&store, &auth, &backend, &notifier);

        let (cart, _) = carts.add_item(ProductId::new(1), 1).await.unwrap();
        assert_eq!(cart.quantity, 1);
        assert!(store.raw().is_none());
        assert_eq!(backend.persisted().quantity, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates_without_side_effects() {
        let store = MemoryCartStore::new();
        let auth = FakeAuth::guest();
        let backend = FakeBackend::failing();
        let notifier = CartNotifier::new();
        let mut observer = notifier.subscribe();
        let carts = CartReconciler::new(&store, &auth, &backend, &notifier);

        let err = carts.add_item(ProductId::new(1), 1).await.unwrap_err();
        assert!(matches!(err, CartError::Backend(_)));
        assert!(store.raw().is_none());
        assert!(observer.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_login_sync_merges_and_clears_guest_cart() {
        let store = MemoryCartStore::new();
        let guest = FakeAuth::guest();
        let backend = FakeBackend::new();
        backend.seed_persisted(ProductId::new(1), 1);
        let notifier = CartNotifier::new();

        CartReconciler::new(&store, &guest, &backend, &notifier)
            .add_item(ProductId::new(1), 2)
            .await
            .unwrap();

        let customer = FakeAuth::customer();
        let token = AccessToken::new("token".to_string());
        let cart = CartReconciler::new(&store, &customer, &backend, &notifier)
            .sync_after_login(&token)
            .await
            .unwrap();

        assert_eq!(cart.quantity, 3);
        assert!(store.raw().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_merge_is_retried_on_next_load() {
        let store = MemoryCartStore::new();
        let guest = FakeAuth::guest();
        let backend = FakeBackend::new();
        backend.seed_persisted(ProductId::new(2), 1);
        let notifier = CartNotifier::new();

        CartReconciler::new(&store, &guest, &backend, &notifier)
            .add_item(ProductId::new(1), 2)
            .await
            .unwrap();

        let customer = FakeAuth::customer();
        let token = AccessToken::new("token".to_string());
        let down = FakeBackend::failing();
        let err = CartReconciler::new(&store, &customer, &down, &notifier)
            .sync_after_login(&token)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Backend(_)));
        assert_eq!(store.read().await.quantity, 2);

        let carts = CartReconciler::new(&store, &customer, &backend, &notifier);
        let cart = carts.load().await.unwrap();
        assert_eq!(cart.quantity, 3);
        assert!(store.raw().is_none());
        assert!(backend.calls().contains(&"sync_cart"));

        // Merged once; later loads read the persisted cart
        carts.load().await.unwrap();
        assert_eq!(backend.calls().last(), Some(&"fetch_cart"));
    }

    #[tokio::test]
    async fn test_forget_local() {
        let store = MemoryCartStore::new();
        let auth = FakeAuth::guest();
        let backend = FakeBackend::new();
        let notifier = CartNotifier::new();
        let carts = CartReconciler::new(&store, &auth, &backend, &notifier);

        carts.add_item(ProductId::new(1), 1).await.unwrap();
        carts.forget_local().await.unwrap();
        assert!(carts.load().await.unwrap().is_empty());
    }
}
