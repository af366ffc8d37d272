//! Inventory domain module.
//!
//! This crate contains business rules for catalogue items and their stock,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod item;

pub use item::{Item, ItemDetails};
