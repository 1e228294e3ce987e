//! Catalog handlers and the pre-payment stock check.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use tienda_core::wire::{
    CheckStockRequest, CheckStockResponse, ProductResponse, ProductsResponse, StockItem,
    StockShortage,
};
use tienda_core::{Product, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/product/", get(list))
        .route("/product/search", get(search))
        .route("/product/check-stock", post(check_stock))
        .route("/product/{slug}", get(show))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn list(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(ProductsResponse { products }))
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ProductsResponse>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(ProductsResponse { products: Vec::new() }));
    }
    let products = ProductRepository::new(state.pool()).search(q).await?;
    Ok(Json(ProductsResponse { products }))
}

#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;
    Ok(Json(ProductResponse { product }))
}

#[instrument(skip(state, body), fields(lines = body.items.len()))]
async fn check_stock(
    State(state): State<AppState>,
    Json(body): Json<CheckStockRequest>,
) -> Result<Json<CheckStockResponse>> {
    let ids: Vec<ProductId> = body.items.iter().map(|item| item.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    let shortages = shortages(&body.items, &products);

    Ok(Json(CheckStockResponse {
        available: shortages.is_empty(),
        shortages,
    }))
}

/// Lines that ask for more than is in stock. Unknown products have none.
fn shortages(items: &[StockItem], products: &[Product]) -> Vec<StockShortage> {
    let stock: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    items
        .iter()
        .filter_map(|item| {
            let available = stock.get(&item.product_id).map_or(0, |p| p.stock);
            let in_stock = stock
                .get(&item.product_id)
                .is_some_and(|p| p.has_stock_for(item.quantity));
            (!in_stock).then_some(StockShortage {
                product_id: item.product_id,
                requested: item.quantity,
                available,
            })
        })
        .collect()
}
