use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::CartId;

use crate::{Cart, CartStore, CartStoreError, Result, Version};

/// In-memory cart store implementation.
///
/// Backs unit tests and local runs without a database. Provides the same
/// contract as the PostgreSQL implementation, including the optimistic
/// version check on save.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<CartId, Cart>>>,
}

impl InMemoryCartStore {
    /// Creates a new empty in-memory cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored carts.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Removes every stored cart.
    pub async fn clear(&self) {
        self.carts.write().await.clear();
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn insert(&self, cart: &Cart) -> Result<()> {
        let mut carts = self.carts.write().await;

        if carts.contains_key(&cart.id()) {
            return Err(CartStoreError::AlreadyExists(cart.id()));
        }

        let mut stored = cart.clone();
        stored.set_version(Version::first());
        stored.touch(Utc::now());
        carts.insert(stored.id(), stored);
        Ok(())
    }

    async fn find_by_id(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts.get(&cart_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Cart>> {
        let carts = self.carts.read().await;
        let mut all: Vec<_> = carts.values().cloned().collect();
        all.sort_by_key(|c| (c.created_at(), c.id().as_uuid()));
        Ok(all)
    }

    async fn save(&self, cart: &Cart) -> Result<Version> {
        let mut carts = self.carts.write().await;

        let current = carts
            .get(&cart.id())
            .ok_or(CartStoreError::CartNotFound(cart.id()))?;

        if current.version() != cart.version() {
            return Err(CartStoreError::VersionConflict {
                cart_id: cart.id(),
                expected: cart.version(),
                actual: current.version(),
            });
        }

        let new_version = cart.version().next();
        let mut stored = cart.clone();
        stored.set_version(new_version);
        stored.touch(Utc::now());
        carts.insert(stored.id(), stored);
        Ok(new_version)
    }

    async fn delete(&self, cart_id: CartId) -> Result<bool> {
        let mut carts = self.carts.write().await;
        Ok(carts.remove(&cart_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn insert_new_cart(store: &InMemoryCartStore) -> Cart {
        let cart = Cart::new(CartId::new());
        store.insert(&cart).await.unwrap();
        store.find_by_id(cart.id()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn insert_then_find_by_id() {
        let store = InMemoryCartStore::new();
        let cart = Cart::new(CartId::new());

        store.insert(&cart).await.unwrap();

        let found = store.find_by_id(cart.id()).await.unwrap().unwrap();
        assert_eq!(found.id(), cart.id());
        assert_eq!(found.version(), Version::first());
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let store = InMemoryCartStore::new();
        let cart = Cart::new(CartId::new());

        store.insert(&cart).await.unwrap();
        let result = store.insert(&cart).await;

        assert!(matches!(result, Err(CartStoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown() {
        let store = InMemoryCartStore::new();
        let found = store.find_by_id(CartId::new()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn save_bumps_version_and_is_read_your_writes() {
        let store = InMemoryCartStore::new();
        let mut cart = insert_new_cart(&store).await;

        cart.upsert_line("P1", 2);
        let new_version = store.save(&cart).await.unwrap();
        assert_eq!(new_version, Version::first().next());

        let reloaded = store.find_by_id(cart.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.version(), new_version);
        assert_eq!(reloaded.line_count(), 1);
    }

    #[tokio::test]
    async fn save_with_stale_version_conflicts() {
        let store = InMemoryCartStore::new();
        let stale = insert_new_cart(&store).await;

        // A second writer saves first.
        let mut winner = stale.clone();
        winner.upsert_line("P1", 1);
        store.save(&winner).await.unwrap();

        let mut loser = stale;
        loser.upsert_line("P2", 1);
        let result = store.save(&loser).await;

        assert!(matches!(
            result,
            Err(CartStoreError::VersionConflict { .. })
        ));
        assert!(result.unwrap_err().is_version_conflict());
    }

    #[tokio::test]
    async fn save_on_missing_cart_is_not_found() {
        let store = InMemoryCartStore::new();
        let cart = Cart::new(CartId::new());

        let result = store.save(&cart).await;
        assert!(matches!(result, Err(CartStoreError::CartNotFound(_))));
    }

    #[tokio::test]
    async fn find_all_lists_in_creation_order() {
        let store = InMemoryCartStore::new();
        let first = insert_new_cart(&store).await;
        let second = insert_new_cart(&store).await;

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        let ids: Vec<_> = all.iter().map(Cart::id).collect();
        assert!(ids.contains(&first.id()));
        assert!(ids.contains(&second.id()));
        assert!(all[0].created_at() <= all[1].created_at());
    }

    #[tokio::test]
    async fn delete_reports_whether_record_existed() {
        let store = InMemoryCartStore::new();
        let cart = insert_new_cart(&store).await;

        assert!(store.delete(cart.id()).await.unwrap());
        assert!(!store.delete(cart.id()).await.unwrap());
        assert!(store.find_by_id(cart.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saves_on_different_carts_do_not_interfere() {
        let store = InMemoryCartStore::new();
        let mut a = insert_new_cart(&store).await;
        let mut b = insert_new_cart(&store).await;

        a.upsert_line("P1", 1);
        b.upsert_line("P2", 1);

        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let a = store.find_by_id(a.id()).await.unwrap().unwrap();
        let b = store.find_by_id(b.id()).await.unwrap().unwrap();
        assert_eq!(a.line_count(), 1);
        assert_eq!(b.line_count(), 1);
    }
}
