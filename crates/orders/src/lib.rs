//! Order lifecycle domain module.
//!
//! This crate contains business rules for orders, their lines and delivery,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod order;
pub mod search;

pub use order::{Delivery, DeliveryStatus, Order, OrderItem, OrderStatus};
pub use search::OrderSearch;
