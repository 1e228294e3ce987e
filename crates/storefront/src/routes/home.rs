//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::products::ProductView;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub products: Vec<ProductView>,
    pub error: Option<String>,
    /// Greeting name of a logged-in customer.
    pub customer_name: Option<String>,
}

/// Display the home page with the catalog.
#[instrument(skip(state, customer))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
) -> impl IntoResponse {
    let customer_name = customer.map(|c| c.first_name);
    match state.api().list_products().await {
        Ok(products) => HomeTemplate {
            products: products.iter().map(ProductView::from).collect(),
            error: None,
            customer_name,
        },
        Err(e) => {
            tracing::warn!("Failed to load catalog: {e}");
            HomeTemplate {
                products: Vec::new(),
                error: Some("No pudimos cargar los productos. Inténtalo más tarde.".to_string()),
                customer_name,
            }
        }
    }
}
