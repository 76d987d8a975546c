//! Shared identifier types used across the cart service crates.

pub mod types;

pub use types::{CartId, ProductId};
