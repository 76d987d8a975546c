//! Cart endpoints: the HTTP surface over the cart manager.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::{Cart, CartStore, LineItem};
use common::{CartId, ProductId};
use domain::{CartService, ProductCatalog};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CartStore> {
    pub cart_service: CartService<S>,
    pub catalog: Arc<dyn ProductCatalog>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct ReplaceItemsRequest {
    pub products: Vec<ReplacementItem>,
}

#[derive(Deserialize)]
pub struct ReplacementItem {
    pub product_id: String,
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub quantity: u32,
}

impl From<&LineItem> for LineItemResponse {
    fn from(line: &LineItem) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            quantity: line.quantity,
        }
    }
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub items: Vec<LineItemResponse>,
    pub total_quantity: u64,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id().to_string(),
            items: cart.lines().iter().map(LineItemResponse::from).collect(),
            total_quantity: cart.total_quantity(),
        }
    }
}

#[derive(Serialize)]
pub struct ReplaceItemsResponse {
    pub status: &'static str,
    pub payload: Vec<LineItemResponse>,
}

// -- Handlers --

/// POST /carts — create a new empty cart.
#[tracing::instrument(skip(state))]
pub async fn create<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart = state.cart_service.create_cart().await?;
    Ok((StatusCode::CREATED, Json(CartResponse::from(&cart))))
}

/// GET /carts — list all carts.
#[tracing::instrument(skip(state))]
pub async fn list<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CartResponse>>, ApiError> {
    let carts = state.cart_service.get_all_carts().await?;
    Ok(Json(carts.iter().map(CartResponse::from).collect()))
}

/// GET /carts/:cart_id — load one cart by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&cart_id)?;
    let cart = state
        .cart_service
        .get_cart(cart_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart {cart_id} not found")))?;

    Ok(Json(CartResponse::from(&cart)))
}

/// POST /carts/:cart_id/product/:product_id — add units of a product,
/// merging into an existing line.
#[tracing::instrument(skip(state, req))]
pub async fn add_product<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, product_id)): Path<(String, String)>,
    Json(req): Json<QuantityRequest>,
) -> Result<(StatusCode, Json<LineItemResponse>), ApiError> {
    let cart_id = parse_cart_id(&cart_id)?;

    let (_cart, line) = state
        .cart_service
        .add_product(cart_id, ProductId::new(product_id), req.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(LineItemResponse::from(&line))))
}

/// DELETE /carts/:cart_id/product/:product_id — remove one line.
#[tracing::instrument(skip(state))]
pub async fn remove_product<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, product_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let cart_id = parse_cart_id(&cart_id)?;

    state
        .cart_service
        .remove_product(cart_id, ProductId::new(product_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /carts/:cart_id — remove every line. The cart record survives.
#[tracing::instrument(skip(state))]
pub async fn clear<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cart_id = parse_cart_id(&cart_id)?;

    state.cart_service.clear_cart(cart_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /carts/:cart_id — wholesale replacement of the item list.
#[tracing::instrument(skip(state, req))]
pub async fn replace_items<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<String>,
    Json(req): Json<ReplaceItemsRequest>,
) -> Result<Json<ReplaceItemsResponse>, ApiError> {
    let cart_id = parse_cart_id(&cart_id)?;

    let items: Vec<(ProductId, i64)> = req
        .products
        .into_iter()
        .map(|item| (ProductId::new(item.product_id), item.quantity))
        .collect();

    let cart = state.cart_service.replace_items(cart_id, items).await?;

    Ok(Json(ReplaceItemsResponse {
        status: "success",
        payload: cart.lines().iter().map(LineItemResponse::from).collect(),
    }))
}

/// PUT /carts/:cart_id/products/:product_id — set a line's quantity.
/// Zero deletes the line; the response then carries quantity 0.
#[tracing::instrument(skip(state, req))]
pub async fn set_quantity<S: CartStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, product_id)): Path<(String, String)>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<LineItemResponse>, ApiError> {
    let cart_id = parse_cart_id(&cart_id)?;
    let product_id = ProductId::new(product_id);

    let (_cart, line) = state
        .cart_service
        .set_quantity(cart_id, product_id.clone(), req.quantity)
        .await?;

    let response = match line {
        Some(line) => LineItemResponse::from(&line),
        None => LineItemResponse {
            product_id: product_id.to_string(),
            quantity: 0,
        },
    };
    Ok(Json(response))
}

fn parse_cart_id(id: &str) -> Result<CartId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid cart ID format: {e}")))?;
    Ok(CartId::from_uuid(uuid))
}
