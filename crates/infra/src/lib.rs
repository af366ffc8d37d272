//! Infrastructure layer: persistence and configuration.

pub mod config;
pub mod store;

pub use config::{ConfigError, DatabaseConfig, StoreBackend, StoreConfig};
pub use store::{
    InMemoryStore, ItemRepository, MemberRepository, OrderRepository, PgStore, StoreError,
    Transaction, UnitOfWork,
};
