//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use cart_store::{CartStore, InMemoryCartStore, PostgresCartStore};
use domain::{InMemoryProductCatalog, Product, ProductCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Demo catalog entries used until a real catalog service is wired in.
fn demo_products() -> Vec<Product> {
    vec![
        Product::new("P1", "Widget", 1999, 25),
        Product::new("P2", "Gadget", 4950, 10),
        Product::new("P3", "Sprocket", 250, 180),
    ]
}

async fn serve<S: CartStore + 'static>(
    store: S,
    catalog: Arc<dyn ProductCatalog>,
    metrics_handle: PrometheusHandle,
    addr: &str,
) {
    let state = api::create_state(store, catalog);
    let app = api::create_app(state, metrics_handle);

    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load configuration and seed the catalog collaborator
    let config = Config::from_env();
    let catalog: Arc<dyn ProductCatalog> =
        Arc::new(InMemoryProductCatalog::with_products(demo_products()).await);
    tracing::info!("seeded demo product catalog");

    // 4. Pick the store and run
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresCartStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL cart store");
            serve(store, catalog, metrics_handle, &config.addr()).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory cart store");
            serve(
                InMemoryCartStore::new(),
                catalog,
                metrics_handle,
                &config.addr(),
            )
            .await;
        }
    }
}
