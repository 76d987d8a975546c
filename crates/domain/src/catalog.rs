//! Product catalog collaborator.
//!
//! The cart manager only reads the catalog: it checks that a product
//! reference exists before letting it into a cart. Prices and stock are
//! carried for the product endpoints but are never cached inside carts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use common::ProductId;

/// A product catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
}

impl Product {
    /// Creates a new catalog entry.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price_cents: i64,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price_cents,
            stock,
        }
    }
}

/// Read-only source of product existence, price and stock.
///
/// Implementations must be thread-safe; the manager shares one catalog
/// across all requests.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product by ID.
    async fn find_product(&self, product_id: &ProductId) -> Option<Product>;

    /// Lists every product, ordered by ID for stable output.
    async fn all_products(&self) -> Vec<Product>;

    /// Returns whether the product exists in the catalog.
    async fn product_exists(&self, product_id: &ProductId) -> bool {
        self.find_product(product_id).await.is_some()
    }
}

/// In-memory product catalog.
///
/// Stands in for the real catalog service behind the same trait, so the
/// manager can be exercised without any external dependency.
#[derive(Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with the given products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.upsert(product).await;
        }
        catalog
    }

    /// Inserts or replaces a catalog entry.
    pub async fn upsert(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_product(&self, product_id: &ProductId) -> Option<Product> {
        self.products.read().await.get(product_id).cloned()
    }

    async fn all_products(&self) -> Vec<Product> {
        let mut products: Vec<_> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        products
    }
}
