//! Cart manager: the single mutation path for cart aggregates.

use std::sync::Arc;

use cart_store::{Cart, CartStore, LineItem};
use common::{CartId, ProductId};

use crate::catalog::ProductCatalog;
use crate::error::{CartError, DomainError};

/// Service owning all business rules for cart lifecycle and line-item
/// mutation. The only writer of the cart store.
///
/// Every mutation is a read-modify-write cycle against the store's
/// optimistic version check: validation runs on a local copy first, so a
/// rejected operation never leaves a half-applied cart behind, and a lost
/// race against a concurrent writer is retried from a fresh read rather
/// than silently dropping either update. Mutations on different carts
/// never contend.
pub struct CartService<S: CartStore> {
    store: S,
    catalog: Arc<dyn ProductCatalog>,
}

impl<S: CartStore> CartService<S> {
    /// Creates a new cart service with the given store and catalog.
    pub fn new(store: S, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the product catalog collaborator.
    pub fn catalog(&self) -> &Arc<dyn ProductCatalog> {
        &self.catalog
    }

    /// Creates a new empty cart with a fresh identifier.
    #[tracing::instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart, DomainError> {
        let mut cart = Cart::new(CartId::new());
        self.store.insert(&cart).await?;
        cart.set_version(cart_store::Version::first());

        metrics::counter!("carts_created_total").increment(1);
        tracing::info!(cart_id = %cart.id(), "cart created");
        Ok(cart)
    }

    /// Lists every persisted cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_carts(&self) -> Result<Vec<Cart>, DomainError> {
        Ok(self.store.find_all().await?)
    }

    /// Loads a cart by ID. Returns `None` if it does not exist — never an
    /// empty cart. Does not mutate state.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>, DomainError> {
        Ok(self.store.find_by_id(cart_id).await?)
    }

    /// Adds `quantity` units of a product to a cart.
    ///
    /// Merge semantics: if the cart already holds a line for the product,
    /// its quantity is increased; otherwise a new line is appended. The
    /// quantity must be strictly positive and the product must exist in
    /// the catalog. Returns the updated cart together with the affected
    /// line so the caller can tell exactly what was written.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(Cart, LineItem), DomainError> {
        let quantity = positive_quantity(quantity)?;

        if !self.catalog.product_exists(&product_id).await {
            return Err(DomainError::ProductNotFound { product_id });
        }

        self.mutate(cart_id, |cart| {
            Ok(cart.upsert_line(product_id.clone(), quantity).clone())
        })
        .await
    }

    /// Removes the line for a product from a cart.
    ///
    /// Fails with `ProductNotInCart` when the cart exists but holds no
    /// such line, keeping that case distinguishable from a missing cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_product(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Cart, DomainError> {
        let (cart, ()) = self
            .mutate(cart_id, |cart| {
                if cart.remove_line(&product_id) {
                    Ok(())
                } else {
                    Err(CartError::ProductNotInCart {
                        product_id: product_id.clone(),
                    })
                }
            })
            .await?;
        Ok(cart)
    }

    /// Empties a cart's item list. The cart record itself survives, so
    /// "clear" is not "delete cart". Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, cart_id: CartId) -> Result<Cart, DomainError> {
        let (cart, ()) = self
            .mutate(cart_id, |cart| {
                cart.clear_lines();
                Ok(())
            })
            .await?;
        Ok(cart)
    }

    /// Wholesale replacement of a cart's item list.
    ///
    /// The supplied sequence becomes the new source of truth; nothing is
    /// merged with prior content. Every entry is validated (strictly
    /// positive quantity, catalog existence) before any state change, so
    /// the replacement is all-or-nothing.
    #[tracing::instrument(skip(self, items))]
    pub async fn replace_items(
        &self,
        cart_id: CartId,
        items: Vec<(ProductId, i64)>,
    ) -> Result<Cart, DomainError> {
        let mut lines = Vec::with_capacity(items.len());
        for (product_id, quantity) in items {
            let quantity = positive_quantity(quantity)?;
            if !self.catalog.product_exists(&product_id).await {
                return Err(DomainError::ProductNotFound { product_id });
            }
            lines.push(LineItem::new(product_id, quantity));
        }

        let (cart, ()) = self
            .mutate(cart_id, |cart| {
                cart.replace_lines(lines.clone());
                Ok(())
            })
            .await?;
        Ok(cart)
    }

    /// Sets the quantity of an existing line.
    ///
    /// A quantity of zero deletes the line (returning `None`); a positive
    /// quantity replaces the line's value. Unlike [`CartService::add_product`],
    /// this never creates a line: updating a product absent from the cart
    /// fails with `ProductNotInCart`.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(Cart, Option<LineItem>), DomainError> {
        let quantity = non_negative_quantity(quantity)?;

        self.mutate(cart_id, |cart| {
            if quantity == 0 {
                if cart.remove_line(&product_id) {
                    Ok(None)
                } else {
                    Err(CartError::ProductNotInCart {
                        product_id: product_id.clone(),
                    })
                }
            } else {
                cart.set_line_quantity(&product_id, quantity)
                    .cloned()
                    .map(Some)
                    .ok_or_else(|| CartError::ProductNotInCart {
                        product_id: product_id.clone(),
                    })
            }
        })
        .await
    }

    /// Read-modify-write cycle with optimistic retry.
    ///
    /// Loads the cart, applies `apply` to a local copy, and saves with the
    /// loaded version. A version conflict means another writer saved in
    /// between; the cycle restarts from a fresh read, so no update is ever
    /// lost. Validation errors from `apply` abort before anything is
    /// written; store failures propagate without retry.
    async fn mutate<T, F>(&self, cart_id: CartId, apply: F) -> Result<(Cart, T), DomainError>
    where
        F: Fn(&mut Cart) -> Result<T, CartError>,
    {
        loop {
            let mut cart = self
                .store
                .find_by_id(cart_id)
                .await?
                .ok_or(DomainError::CartNotFound { cart_id })?;

            let outcome = apply(&mut cart).map_err(DomainError::Cart)?;

            match self.store.save(&cart).await {
                Ok(new_version) => {
                    cart.set_version(new_version);
                    metrics::counter!("cart_mutations_total").increment(1);
                    return Ok((cart, outcome));
                }
                Err(e) if e.is_version_conflict() => {
                    metrics::counter!("cart_version_conflicts_total").increment(1);
                    tracing::debug!(%cart_id, "version conflict, retrying mutation");
                }
                Err(cart_store::CartStoreError::CartNotFound(_)) => {
                    return Err(DomainError::CartNotFound { cart_id });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CartError> {
    match u32::try_from(quantity) {
        Ok(q) if q >= 1 => Ok(q),
        _ => Err(CartError::InvalidQuantity { quantity }),
    }
}

fn non_negative_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity { quantity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryProductCatalog, Product};
    use cart_store::InMemoryCartStore;

    async fn setup() -> CartService<InMemoryCartStore> {
        let catalog = InMemoryProductCatalog::with_products([
            Product::new("P1", "Widget", 1000, 10),
            Product::new("P2", "Gadget", 500, 4),
        ])
        .await;
        CartService::new(InMemoryCartStore::new(), Arc::new(catalog))
    }

    #[tokio::test]
    async fn create_cart_starts_empty() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        assert!(cart.is_empty());

        let reloaded = service.get_cart(cart.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.id(), cart.id());
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn get_cart_on_unknown_id_is_none_not_empty_cart() {
        let service = setup().await;
        assert!(service.get_cart(CartId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn adding_same_product_twice_merges_quantities() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 2)
            .await
            .unwrap();
        let (cart, line) = service
            .add_product(cart.id(), ProductId::new("P1"), 3)
            .await
            .unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(line.quantity, 5);
        assert_eq!(cart.line(&ProductId::new("P1")).unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn add_rejects_non_positive_quantity_and_leaves_cart_unchanged() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        for bad in [0, -3] {
            let result = service
                .add_product(cart.id(), ProductId::new("P1"), bad)
                .await;
            assert!(matches!(
                result,
                Err(DomainError::Cart(CartError::InvalidQuantity { .. }))
            ));
        }

        let reloaded = service.get_cart(cart.id()).await.unwrap().unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn add_unknown_product_is_product_not_found() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        let result = service
            .add_product(cart.id(), ProductId::new("NOPE"), 1)
            .await;
        assert!(matches!(result, Err(DomainError::ProductNotFound { .. })));
    }

    #[tokio::test]
    async fn add_to_unknown_cart_is_cart_not_found() {
        let service = setup().await;
        let result = service
            .add_product(CartId::new(), ProductId::new("P1"), 1)
            .await;
        assert!(matches!(result, Err(DomainError::CartNotFound { .. })));
    }

    #[tokio::test]
    async fn remove_product_deletes_single_line() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 1)
            .await
            .unwrap();
        service
            .add_product(cart.id(), ProductId::new("P2"), 1)
            .await
            .unwrap();

        let cart = service
            .remove_product(cart.id(), ProductId::new("P1"))
            .await
            .unwrap();

        assert_eq!(cart.line_count(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.product_id, ProductId::new("P2"));
        assert_eq!(line.quantity, 1);
    }

    #[tokio::test]
    async fn remove_missing_line_is_distinguishable_from_missing_cart() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        let result = service
            .remove_product(cart.id(), ProductId::new("P1"))
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Cart(CartError::ProductNotInCart { .. }))
        ));

        let result = service
            .remove_product(CartId::new(), ProductId::new("P1"))
            .await;
        assert!(matches!(result, Err(DomainError::CartNotFound { .. })));
    }

    #[tokio::test]
    async fn clear_empties_but_preserves_the_record_idempotently() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 2)
            .await
            .unwrap();

        let cleared = service.clear_cart(cart.id()).await.unwrap();
        assert!(cleared.is_empty());

        let cleared_again = service.clear_cart(cart.id()).await.unwrap();
        assert!(cleared_again.is_empty());
        assert_eq!(cleared_again.id(), cart.id());

        let reloaded = service.get_cart(cart.id()).await.unwrap().unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn clear_on_unknown_cart_is_cart_not_found() {
        let service = setup().await;
        let result = service.clear_cart(CartId::new()).await;
        assert!(matches!(result, Err(DomainError::CartNotFound { .. })));
    }

    #[tokio::test]
    async fn replace_items_discards_prior_content() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 5)
            .await
            .unwrap();

        let cart = service
            .replace_items(cart.id(), vec![(ProductId::new("P2"), 2)])
            .await
            .unwrap();

        assert!(cart.line(&ProductId::new("P1")).is_none());
        assert_eq!(cart.line(&ProductId::new("P2")).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn replace_items_is_all_or_nothing() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 1)
            .await
            .unwrap();

        // Second entry is invalid; the first must not be applied.
        let result = service
            .replace_items(
                cart.id(),
                vec![(ProductId::new("P2"), 2), (ProductId::new("P1"), 0)],
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Cart(CartError::InvalidQuantity { .. }))
        ));

        let result = service
            .replace_items(
                cart.id(),
                vec![(ProductId::new("P2"), 2), (ProductId::new("NOPE"), 1)],
            )
            .await;
        assert!(matches!(result, Err(DomainError::ProductNotFound { .. })));

        let reloaded = service.get_cart(cart.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.line_count(), 1);
        assert_eq!(reloaded.line(&ProductId::new("P1")).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn set_quantity_replaces_value() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 2)
            .await
            .unwrap();

        let (cart, line) = service
            .set_quantity(cart.id(), ProductId::new("P1"), 7)
            .await
            .unwrap();

        assert_eq!(line.unwrap().quantity, 7);
        assert_eq!(cart.line(&ProductId::new("P1")).unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn set_quantity_zero_removes_the_line() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        service
            .add_product(cart.id(), ProductId::new("P1"), 2)
            .await
            .unwrap();

        let (cart, line) = service
            .set_quantity(cart.id(), ProductId::new("P1"), 0)
            .await
            .unwrap();

        assert!(line.is_none());
        assert!(cart.line(&ProductId::new("P1")).is_none());
    }

    #[tokio::test]
    async fn set_quantity_rejects_negative() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        let result = service
            .set_quantity(cart.id(), ProductId::new("P1"), -1)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Cart(CartError::InvalidQuantity { .. }))
        ));
    }

    #[tokio::test]
    async fn set_quantity_on_absent_line_is_not_found() {
        let service = setup().await;
        let cart = service.create_cart().await.unwrap();

        let result = service
            .set_quantity(cart.id(), ProductId::new("P1"), 3)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Cart(CartError::ProductNotInCart { .. }))
        ));
    }

    #[tokio::test]
    async fn concurrent_adds_to_same_line_lose_no_updates() {
        const WRITERS: u32 = 16;

        let service = Arc::new(setup().await);
        let cart = service.create_cart().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..WRITERS {
            let service = Arc::clone(&service);
            let cart_id = cart.id();
            handles.push(tokio::spawn(async move {
                service
                    .add_product(cart_id, ProductId::new("P1"), 1)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cart = service.get_cart(cart.id()).await.unwrap().unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line(&ProductId::new("P1")).unwrap().quantity, WRITERS);
    }

    #[tokio::test]
    async fn concurrent_writers_on_different_carts_are_independent() {
        let service = Arc::new(setup().await);
        let a = service.create_cart().await.unwrap();
        let b = service.create_cart().await.unwrap();

        let mut handles = Vec::new();
        for cart_id in [a.id(), b.id()] {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                for _ in 0..8 {
                    service
                        .add_product(cart_id, ProductId::new("P2"), 1)
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for cart_id in [a.id(), b.id()] {
            let cart = service.get_cart(cart_id).await.unwrap().unwrap();
            assert_eq!(cart.line(&ProductId::new("P2")).unwrap().quantity, 8);
        }
    }

    #[tokio::test]
    async fn get_all_carts_lists_everything() {
        let service = setup().await;
        service.create_cart().await.unwrap();
        service.create_cart().await.unwrap();

        let all = service.get_all_carts().await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
