//! HTTP API server for the cart service.
//!
//! Thin adapter over the domain layer: routes translate requests into
//! [`domain::CartService`] calls and domain results into status codes,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use cart_store::CartStore;
use domain::{CartService, ProductCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::carts::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CartStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/carts", post(routes::carts::create::<S>))
        .route("/carts", get(routes::carts::list::<S>))
        .route("/carts/{cart_id}", get(routes::carts::get::<S>))
        .route("/carts/{cart_id}", put(routes::carts::replace_items::<S>))
        .route("/carts/{cart_id}", axum::routing::delete(routes::carts::clear::<S>))
        .route(
            "/carts/{cart_id}/product/{product_id}",
            post(routes::carts::add_product::<S>)
                .delete(routes::carts::remove_product::<S>),
        )
        .route(
            "/carts/{cart_id}/products/{product_id}",
            put(routes::carts::set_quantity::<S>),
        )
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{product_id}", get(routes::products::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state from a store and a catalog.
pub fn create_state<S: CartStore + 'static>(
    store: S,
    catalog: Arc<dyn ProductCatalog>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        cart_service: CartService::new(store, Arc::clone(&catalog)),
        catalog,
    })
}
