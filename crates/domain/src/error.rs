//! Domain error taxonomy.

use cart_store::CartStoreError;
use common::{CartId, ProductId};
use thiserror::Error;

/// Errors raised by cart aggregate rules.
#[derive(Debug, Error)]
pub enum CartError {
    /// The supplied quantity violates the operation's sign/zero constraint.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The referenced product has no line in the cart.
    #[error("Product {product_id} is not in the cart")]
    ProductNotInCart { product_id: ProductId },
}

/// Errors that can occur during cart manager operations.
///
/// The three groups callers care about are kept distinguishable:
/// not-found (`CartNotFound`, `ProductNotFound`, `Cart(ProductNotInCart)`),
/// invalid argument (`Cart(InvalidQuantity)`), and store failure (`Store`).
#[derive(Debug, Error)]
pub enum DomainError {
    /// No cart exists for the given identifier.
    #[error("Cart not found: {cart_id}")]
    CartNotFound { cart_id: CartId },

    /// The product does not exist in the catalog.
    #[error("Product not found in catalog: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// A cart aggregate rule was violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// The persistence layer could not complete the operation. Never
    /// swallowed and never retried by the manager.
    #[error("Cart store error: {0}")]
    Store(#[from] CartStoreError),
}
