//! Search route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use super::products::ProductView;
use crate::state::AppState;

/// Search page query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search page template.
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub query: String,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Display search results.
///
/// A blank query shows the empty form without calling the API.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let q = query.q.trim().to_string();
    if q.is_empty() {
        return SearchTemplate {
            query: q,
            products: Vec::new(),
            error: None,
        };
    }

    match state.api().search_products(&q).await {
        Ok(products) => SearchTemplate {
            query: q,
            products: products.iter().map(ProductView::from).collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Product search failed: {e}");
            SearchTemplate {
                query: q,
                products: Vec::new(),
                error: Some("La búsqueda no está disponible en este momento.".to_string()),
            }
        }
    }
}
