//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use tienda_core::{Product, ProductId, format_clp};

use crate::error::AppError;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: format_clp(product.price),
            image_url: product.image_url.clone(),
            category: product.category.clone(),
            in_stock: product.has_stock_for(1),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
}

/// Display product detail page.
///
/// An unknown slug renders the not-found page; other backend failures go
/// through [`AppError`].
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match state.api().get_product(&slug).await {
        Ok(product) => ProductShowTemplate {
            product: ProductView::from(&product),
        }
        .into_response(),
        Err(e) if e.is_not_found() => (
            StatusCode::NOT_FOUND,
            NotFoundTemplate {
                message: "Este producto no existe o ya no está disponible.".to_string(),
            },
        )
            .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_product_view() {
        let product = Product {
            id: ProductId::new(4),
            slug: "te-verde".to_string(),
            name: "Té verde".to_string(),
            description: "Sencha orgánico".to_string(),
            price: Decimal::new(4_500, 0),
            stock: 0,
            image_url: None,
            category: Some("Té".to_string()),
        };

        let view = ProductView::from(&product);
        assert_eq!(view.price, "$4.500");
        assert!(!view.in_stock);
        assert_eq!(view.category.as_deref(), Some("Té"));
    }
}
