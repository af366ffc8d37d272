//! Bookstore application services.
//!
//! Services take a [`UnitOfWork`] in their constructor and open one
//! transaction per call. [`build_services`] wires them to the store picked
//! by [`StoreConfig`].

pub mod error;
pub mod item_service;
pub mod member_service;
pub mod order_service;
pub mod seed;
mod unit_of_work;

pub use error::{ServiceError, ServiceResult};
pub use item_service::{ItemService, ItemUpdate};
pub use member_service::MemberService;
pub use order_service::{OrderLine, OrderService};

use bookstore_infra::{InMemoryStore, PgStore, StoreBackend, StoreConfig, StoreError, UnitOfWork};

/// The three services sharing one store.
pub struct Services<U> {
    pub members: MemberService<U>,
    pub items: ItemService<U>,
    pub orders: OrderService<U>,
}

impl<U> Services<U>
where
    U: UnitOfWork + Clone,
{
    pub fn new(uow: U) -> Self {
        Self {
            members: MemberService::new(uow.clone()),
            items: ItemService::new(uow.clone()),
            orders: OrderService::new(uow),
        }
    }
}

/// Services over whichever store the configuration selected.
pub enum AppServices {
    InMemory(Services<InMemoryStore>),
    Persistent(Services<PgStore>),
}

/// Connect the configured store and build the services on top of it.
///
/// The Postgres schema is created on startup when missing.
pub async fn build_services(config: &StoreConfig) -> Result<AppServices, StoreError> {
    match &config.backend {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory store");
            Ok(AppServices::InMemory(Services::new(InMemoryStore::new())))
        }
        StoreBackend::Postgres(database) => {
            tracing::info!(?database, "using postgres store");
            let store = PgStore::connect(database).await?;
            store.migrate().await?;
            Ok(AppServices::Persistent(Services::new(store)))
        }
    }
}
