//! Product catalog endpoints (read-only).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use cart_store::CartStore;
use common::ProductId;
use domain::Product;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::carts::AppState;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            price_cents: product.price_cents,
            stock: product.stock,
        }
    }
}

/// GET /products — list the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<ProductResponse>> {
    let products = state.catalog.all_products().await;
    Json(products.into_iter().map(ProductResponse::from).collect())
}

/// GET /products/:product_id — look up one catalog entry.
#[tracing::instrument(skip(state))]
pub async fn get<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = ProductId::new(product_id);
    let product = state
        .catalog
        .find_product(&product_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?;

    Ok(Json(ProductResponse::from(product)))
}
