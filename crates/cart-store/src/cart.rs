//! The cart aggregate as persisted by the store.

use chrono::{DateTime, Utc};
use common::{CartId, ProductId};
use serde::{Deserialize, Serialize};

/// Persisted version of a cart, used for optimistic concurrency control.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a cart that has not been inserted.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first persisted version (1).
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// One (product, quantity) pair inside a cart.
///
/// A persisted line item always carries a quantity of at least 1; a line
/// whose quantity drops to zero is removed from the cart, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog reference. Existence is validated by the manager, not here.
    pub product_id: ProductId,

    /// Number of units, >= 1.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Cart aggregate root: a cart record together with its full item list,
/// treated as one unit of consistency.
///
/// Invariant: no two line items reference the same product ID. All item
/// mutations go through the methods below, which merge quantities instead
/// of appending duplicate lines. Insertion order of distinct products is
/// preserved so listings are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart identifier, assigned at creation, immutable.
    id: CartId,

    /// Ordered line items, at most one per product.
    items: Vec<LineItem>,

    /// Version this aggregate was loaded at. `save` succeeds only if the
    /// persisted row still carries this version.
    #[serde(default)]
    version: Version,

    /// When the cart record was created.
    created_at: DateTime<Utc>,

    /// When the cart record was last written.
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart with the given identifier.
    pub fn new(id: CartId) -> Self {
        let now = Utc::now();
        Self {
            id,
            items: Vec::new(),
            version: Version::initial(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a cart from its persisted parts.
    pub fn from_parts(
        id: CartId,
        items: Vec<LineItem>,
        version: Version,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            items,
            version,
            created_at,
            updated_at,
        }
    }

    /// Returns the cart identifier.
    pub fn id(&self) -> CartId {
        self.id
    }

    /// Returns the version this aggregate was loaded at.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the version after a successful save.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Returns when the cart was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the cart was last written.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the last-written timestamp. Called by stores on save.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Returns the line items in insertion order.
    pub fn lines(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Returns the number of distinct products in the cart.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the cart holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Adds `quantity` units of a product, merging into an existing line.
    ///
    /// If the product is already in the cart its quantity is increased;
    /// otherwise a new line is appended. Returns the resulting line.
    pub fn upsert_line(&mut self, product_id: impl Into<ProductId>, quantity: u32) -> &LineItem {
        let product_id = product_id.into();
        let idx = match self.position(&product_id) {
            Some(idx) => {
                self.items[idx].quantity = self.items[idx].quantity.saturating_add(quantity);
                idx
            }
            None => {
                self.items.push(LineItem::new(product_id, quantity));
                self.items.len() - 1
            }
        };
        &self.items[idx]
    }

    /// Removes the line for a product. Returns whether a line was removed.
    pub fn remove_line(&mut self, product_id: &ProductId) -> bool {
        match self.position(product_id) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Replaces the quantity of an existing line.
    ///
    /// Returns the updated line, or `None` if the product is not in the
    /// cart. `quantity` must be >= 1 here; removal on zero is decided by
    /// the manager, which calls [`Cart::remove_line`] instead.
    pub fn set_line_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Option<&LineItem> {
        let idx = self.position(product_id)?;
        self.items[idx].quantity = quantity;
        Some(&self.items[idx])
    }

    /// Wholesale replacement of the item list.
    ///
    /// The supplied sequence becomes the new source of truth. Duplicate
    /// product IDs in the input are merged so the one-line-per-product
    /// invariant holds regardless of what the caller supplies.
    pub fn replace_lines(&mut self, lines: Vec<LineItem>) {
        self.items.clear();
        for line in lines {
            self.upsert_line(line.product_id, line.quantity);
        }
    }

    /// Removes every line. The cart record itself survives.
    pub fn clear_lines(&mut self) {
        self.items.clear();
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| &item.product_id == product_id)
    }
}
