//! Domain layer for the cart service.
//!
//! This crate owns the business rules for cart lifecycle and line-item
//! mutation. It is the only writer of the cart store:
//! - [`CartService`] — the cart manager, with merge semantics and
//!   per-cart atomicity via optimistic retry
//! - [`ProductCatalog`] — the read-only collaborator the manager
//!   validates product references against
//! - [`DomainError`] / [`CartError`] — the error taxonomy surfaced to
//!   callers (not-found vs invalid-argument vs store failure)

pub mod catalog;
pub mod error;
pub mod service;

pub use cart_store::{Cart, CartId, LineItem, ProductId, Version};

pub use catalog::{InMemoryProductCatalog, Product, ProductCatalog};
pub use error::{CartError, DomainError};
pub use service::CartService;
