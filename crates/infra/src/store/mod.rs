//! Persistence boundary: per-entity repositories behind an explicit unit of work.
//!
//! Services open one [`Transaction`] per call through a [`UnitOfWork`], use
//! the repositories it hands out, then commit or roll back. Two backends are
//! provided: [`InMemoryStore`] for tests/dev and [`PgStore`] for Postgres.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;
pub use r#trait::{
    ItemRepository, MemberRepository, OrderRepository, StoreError, Transaction, UnitOfWork,
};
