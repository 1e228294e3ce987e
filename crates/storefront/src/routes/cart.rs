//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every successful mutation answers with `HX-Trigger: cart-updated` so the
//! header badge refreshes itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tienda_core::{Cart, CartItem, ProductId, format_clp};

use crate::services::CartReconciler;
use crate::services::notifier::HX_CART_UPDATED;
use crate::state::AppState;

/// Shown when the cart cannot be loaded or changed.
pub const CART_UNAVAILABLE: &str = "No pudimos cargar tu carro. Inténtalo nuevamente.";

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
    pub error: Option<String>,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&Cart::empty())
    }

    /// The empty cart shown when the backend fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            error: Some(CART_UNAVAILABLE.to_string()),
            ..Self::empty()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Type Conversions
// =============================================================================

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.cart_items.iter().map(CartItemView::from).collect(),
            total: cart.total_display(),
            item_count: cart.quantity,
            error: None,
        }
    }
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            slug: item.metadata.slug.clone(),
            name: item.metadata.name.clone(),
            quantity: item.quantity,
            price: format_clp(item.metadata.unit_price),
            line_price: item.subtotal().map(format_clp).unwrap_or_default(),
            image_url: item.metadata.image_url.clone(),
        }
    }
}

/// Load the visitor's cart for display, falling back to an empty cart with
/// a message when the backend fails.
pub(crate) async fn load_cart_view(state: &AppState, session: &Session) -> (Cart, CartView) {
    let store = state.cart_store(session);
    let auth = state.session_auth(session);
    let carts = CartReconciler::new(&store, &auth, state.api(), state.notifier());

    match carts.load().await {
        Ok(cart) => {
            let view = CartView::from(&cart);
            (cart, view)
        }
        Err(e) => {
            tracing::warn!("Failed to load cart: {e}");
            (Cart::empty(), CartView::unavailable())
        }
    }
}

// =============================================================================
// Forms and Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (_, cart) = load_cart_view(&state, &session).await;
    CartShowTemplate { cart }
}

/// Add item to cart (HTMX).
///
/// Returns the new badge count. Plain form posts are redirected to the cart
/// page.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let store = state.cart_store(&session);
    let auth = state.session_auth(&session);
    let carts = CartReconciler::new(&store, &auth, state.api(), state.notifier());

    let quantity = form.quantity.unwrap_or(1);
    match carts.add_item(form.product_id, quantity).await {
        Ok((cart, item)) => {
            tracing::info!(
                product_id = %item.product_id,
                line_quantity = item.quantity,
                "Added to cart"
            );

            if !is_htmx(&headers) {
                return Redirect::to("/cart").into_response();
            }

            (
                AppendHeaders([("HX-Trigger", HX_CART_UPDATED)]),
                CartCountTemplate {
                    count: cart.quantity,
                },
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to add item to cart: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Html(format!("<span class=\"cart-error\">{CART_UNAVAILABLE}</span>")),
            )
                .into_response()
        }
    }
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let store = state.cart_store(&session);
    let auth = state.session_auth(&session);
    let carts = CartReconciler::new(&store, &auth, state.api(), state.notifier());

    match carts.remove_item(form.product_id).await {
        Ok(cart) => {
            if !is_htmx(&headers) {
                return Redirect::to("/cart").into_response();
            }

            (
                AppendHeaders([("HX-Trigger", HX_CART_UPDATED)]),
                CartItemsTemplate {
                    cart: CartView::from(&cart),
                },
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to remove from cart: {e}");
            CartItemsTemplate {
                cart: CartView::unavailable(),
            }
            .into_response()
        }
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (cart, _) = load_cart_view(&state, &session).await;
    CartCountTemplate {
        count: cart.quantity,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tienda_core::CartItemMetadata;

    use super::*;

    #[test]
    fn test_cart_view_formats_prices() {
        let mut cart = Cart::empty();
        cart.add_item(
            ProductId::new(3),
            CartItemMetadata {
                name: "Café de grano".to_string(),
                slug: "cafe-de-grano".to_string(),
                unit_price: Decimal::new(12_990, 0),
                image_url: None,
            },
            2,
        )
        .unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total, "$25.980");
        assert_eq!(view.items[0].price, "$12.990");
        assert_eq!(view.items[0].line_price, "$25.980");
        assert!(view.error.is_none());
    }

    #[test]
    fn test_unavailable_cart_is_empty_with_message() {
        let view = CartView::unavailable();
        assert!(view.is_empty());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total, "$0");
        assert_eq!(view.error.as_deref(), Some(CART_UNAVAILABLE));
    }
}
