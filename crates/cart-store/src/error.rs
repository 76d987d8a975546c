use thiserror::Error;

use common::CartId;

use crate::Version;

/// Errors that can occur when interacting with the cart store.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// A cart with this ID already exists; `insert` is creation-only.
    #[error("Cart already exists: {0}")]
    AlreadyExists(CartId),

    /// The cart was not found in the store.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// An optimistic concurrency check failed on save.
    /// Another writer saved the cart since it was loaded.
    #[error("Version conflict for cart {cart_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        cart_id: CartId,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CartStoreError {
    /// Returns true if this error is a lost optimistic-concurrency race.
    ///
    /// Conflicts are the one store error the manager may retry: they mean
    /// another writer made progress, not that the store failed.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, CartStoreError::VersionConflict { .. })
    }
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartStoreError>;
