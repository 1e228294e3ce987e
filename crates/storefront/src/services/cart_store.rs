//! Guest cart persistence.
//!
//! A guest's cart lives in their session under [`session_keys::CART`] as a
//! JSON string. Reads never fail: missing or unreadable content is the empty
//! cart. Writes replace the whole cart.

use std::sync::Mutex;

use async_trait::async_trait;
use tower_sessions::Session;

use tienda_core::Cart;

use crate::models::session_keys;

/// Errors writing to a cart store.
#[derive(Debug, thiserror::Error)]
pub enum CartStoreError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("failed to encode cart: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whole-cart key-value storage for the guest cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The stored cart, or the empty cart when nothing usable is stored.
    async fn read(&self) -> Cart;

    /// Replace the stored cart.
    async fn write(&self, cart: &Cart) -> Result<(), CartStoreError>;

    /// Remove the stored cart.
    async fn clear(&self) -> Result<(), CartStoreError>;
}

/// Decode stored content into a cart with consistent totals.
///
/// Anything that is not a JSON cart yields [`Cart::empty`].
#[must_use]
pub fn decode_cart(raw: Option<&str>) -> Cart {
    let Some(raw) = raw else {
        return Cart::empty();
    };

    let cart = match serde_json::from_str::<Cart>(raw) {
        Ok(cart) => cart,
        Err(e) => {
            tracing::debug!(error = %e, "Discarding unreadable stored cart");
            return Cart::empty();
        }
    };

    cart.normalized().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Discarding stored cart with unusable totals");
        Cart::empty()
    })
}

// =============================================================================
// Session-backed store
// =============================================================================

/// [`CartStore`] over the visitor's `tower-sessions` session.
#[derive(Clone)]
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CartStore for SessionCartStore {
    async fn read(&self) -> Cart {
        match self.session.get::<String>(session_keys::CART).await {
            Ok(raw) => decode_cart(raw.as_deref()),
            Err(e) => {
                tracing::debug!(error = %e, "Stored cart is not a string");
                Cart::empty()
            }
        }
    }

    async fn write(&self, cart: &Cart) -> Result<(), CartStoreError> {
        let raw = serde_json::to_string(cart)?;
        self.session.remove_value(session_keys::CART).await?;
        self.session.insert(session_keys::CART, raw).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        self.session.remove_value(session_keys::CART).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// [`CartStore`] held in memory, seeded with raw content if needed.
#[derive(Default)]
pub struct MemoryCartStore {
    raw: Mutex<Option<String>>,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose content is `raw`, verbatim.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// The stored content, verbatim.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|raw| raw.clone())
    }

    fn set(&self, value: Option<String>) {
        if let Ok(mut raw) = self.raw.lock() {
            *raw = value;
        }
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn read(&self) -> Cart {
        decode_cart(self.raw().as_deref())
    }

    async fn write(&self, cart: &Cart) -> Result<(), CartStoreError> {
        let raw = serde_json::to_string(cart)?;
        self.set(None);
        self.set(Some(raw));
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartStoreError> {
        self.set(None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tienda_core::{CartItemMetadata, ProductId};
    use tower_sessions::MemoryStore;

    use super::*;

    fn sample_cart() -> Cart {
        let mut cart = Cart::empty();
        cart.add_item(
            ProductId::new(1),
            CartItemMetadata {
                name: "Café de grano".to_string(),
                slug: "cafe-de-grano".to_string(),
                unit_price: Decimal::new(8_990, 0),
                image_url: None,
            },
            2,
        )
        .unwrap();
        cart
    }

    #[tokio::test]
    async fn test_missing_or_malformed_content_reads_as_empty() {
        let inputs = [
            None,
            Some(""),
            Some("not json"),
            Some("{\"cart_items\": 7}"),
            Some("[1, 2, 3]"),
            Some("null"),
        ];

        for input in inputs {
            let store = input.map_or_else(MemoryCartStore::new, MemoryCartStore::with_raw);
            let cart = store.read().await;
            assert_eq!(cart, Cart::empty(), "input: {input:?}");
            assert_eq!(cart.quantity, 0);
            assert_eq!(cart.total, Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_overflowing_content_reads_as_empty() {
        let inputs = [
            r#"{"cart_items":[{"product_id":1,"quantity":2,"metadata":{"name":"Té","slug":"te","unit_price":"79228162514264337593543950335"}}],"quantity":2,"total":"0"}"#,
            r#"{"cart_items":[{"product_id":1,"quantity":4294967295,"metadata":{"name":"Té","slug":"te","unit_price":"1"}},{"product_id":2,"quantity":1,"metadata":{"name":"Miel","slug":"miel","unit_price":"1"}}],"quantity":0,"total":"0"}"#,
        ];

        for input in inputs {
            let cart = MemoryCartStore::with_raw(input).read().await;
            assert_eq!(cart, Cart::empty(), "input: {input}");
        }
    }

    #[tokio::test]
    async fn test_read_recomputes_stale_totals() {
        let store = MemoryCartStore::with_raw(
            r#"{"cart_items":[{"product_id":1,"quantity":3,"metadata":{"name":"Té","slug":"te","unit_price":"1000"}}],"quantity":99,"total":"1"}"#,
        );
        let cart = store.read().await;
        assert_eq!(cart.quantity, 3);
        assert_eq!(cart.total, Decimal::new(3_000, 0));
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let cart = sample_cart();

        let once = MemoryCartStore::new();
        once.write(&cart).await.unwrap();

        let twice = MemoryCartStore::new();
        twice.write(&cart).await.unwrap();
        twice.write(&cart).await.unwrap();

        assert_eq!(once.raw(), twice.raw());
        assert_eq!(twice.read().await, cart);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryCartStore::new();
        store.write(&sample_cart()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.raw().is_none());
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_store_round_trip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let store = SessionCartStore::new(session.clone());
        assert!(store.read().await.is_empty());

        let cart = sample_cart();
        store.write(&cart).await.unwrap();
        assert_eq!(store.read().await, cart);

        // Stored as a JSON string, not as a nested object
        let raw: String = session.get(session_keys::CART).await.unwrap().unwrap();
        assert_eq!(raw, serde_json::to_string(&cart).unwrap());

        store.clear().await.unwrap();
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_session_store_ignores_non_string_value() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session
            .insert(session_keys::CART, serde_json::json!({ "cart_items": "oops" }))
            .await
            .unwrap();

        let store = SessionCartStore::new(session);
        assert!(store.read().await.is_empty());
    }
}
