use async_trait::async_trait;

use common::CartId;

use crate::{Cart, Result, Version};

/// Core trait for cart store implementations.
///
/// A cart store persists whole cart aggregates keyed by cart ID. All
/// implementations must be thread-safe (Send + Sync) and provide
/// read-your-writes visibility: a successful `save` is observable by any
/// subsequent `find_by_id`, regardless of caller.
///
/// `save` carries the aggregate's loaded version and fails with
/// [`CartStoreError::VersionConflict`](crate::CartStoreError::VersionConflict)
/// if the persisted row has moved on, so concurrent read-modify-write cycles
/// on the same cart can never silently drop an update. Saves on different
/// cart IDs never interfere.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Persists a new cart at [`Version::first`].
    ///
    /// Fails with `AlreadyExists` if the ID is taken.
    async fn insert(&self, cart: &Cart) -> Result<()>;

    /// Retrieves a cart by ID. Returns `None` if it does not exist.
    ///
    /// The returned aggregate carries the version to pass back to `save`.
    async fn find_by_id(&self, cart_id: CartId) -> Result<Option<Cart>>;

    /// Retrieves all persisted carts in creation order.
    async fn find_all(&self) -> Result<Vec<Cart>>;

    /// Full-aggregate upsert guarded by an optimistic version check.
    ///
    /// Succeeds only if the persisted version still equals `cart.version()`,
    /// writing the item list and bumping to the next version, which is
    /// returned. Fails with `VersionConflict` on a lost race and
    /// `CartNotFound` if the row no longer exists.
    async fn save(&self, cart: &Cart) -> Result<Version>;

    /// Deletes a cart record entirely. Returns whether a record existed.
    ///
    /// Not exercised by the cart manager in normal flows ("clear" empties
    /// the item list instead); kept for completeness of the contract.
    async fn delete(&self, cart_id: CartId) -> Result<bool>;
}
