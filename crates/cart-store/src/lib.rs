//! Persistence layer for cart aggregates.
//!
//! Defines the [`Cart`] aggregate as it is persisted, the [`CartStore`]
//! contract, and two implementations: an in-memory store for tests and
//! local runs, and a PostgreSQL store for deployments. Per-cart atomicity
//! is provided by an optimistic version check on [`CartStore::save`].

pub mod cart;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{CartId, ProductId};

pub use cart::{Cart, LineItem, Version};
pub use error::{CartStoreError, Result};
pub use memory::InMemoryCartStore;
pub use postgres::PostgresCartStore;
pub use store::CartStore;
