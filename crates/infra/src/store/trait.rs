use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use bookstore_core::{ItemId, MemberId, OrderId};
use bookstore_inventory::Item;
use bookstore_members::Member;
use bookstore_orders::{Order, OrderSearch};

/// Store operation error.
///
/// These are **infrastructure errors** (backend, conflicts, encoding) as
/// opposed to domain errors (validation, invariants, stock shortages).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A commit lost a race, or a uniqueness constraint was hit.
    #[error("store conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection, lock poisoning, SQL error).
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A domain value could not be written to the backend representation.
    #[error("encode failure: {0}")]
    Encode(String),

    /// A stored row could not be turned back into a domain value.
    #[error("decode failure: {0}")]
    Decode(String),
}

/// Member persistence, scoped to one transaction.
#[async_trait]
pub trait MemberRepository: Send {
    /// Insert or replace a member.
    async fn save(&mut self, member: &Member) -> Result<(), StoreError>;

    async fn find_one(&mut self, id: MemberId) -> Result<Option<Member>, StoreError>;

    async fn find_all(&mut self) -> Result<Vec<Member>, StoreError>;

    /// Members whose name equals `name` exactly.
    async fn find_by_name(&mut self, name: &str) -> Result<Vec<Member>, StoreError>;
}

/// Item persistence, scoped to one transaction.
#[async_trait]
pub trait ItemRepository: Send {
    /// Insert or replace an item.
    async fn save(&mut self, item: &Item) -> Result<(), StoreError>;

    async fn find_one(&mut self, id: ItemId) -> Result<Option<Item>, StoreError>;

    async fn find_all(&mut self) -> Result<Vec<Item>, StoreError>;
}

/// Order persistence, scoped to one transaction.
#[async_trait]
pub trait OrderRepository: Send {
    /// Insert or replace an order together with its lines and delivery.
    async fn save(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn find_one(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders passing `search`, ordered by order date (oldest first).
    async fn find_all_by_order_status(
        &mut self,
        search: &OrderSearch,
    ) -> Result<Vec<Order>, StoreError>;
}

/// One open unit of work.
///
/// Writes made through the repositories handed out here become visible to
/// other units of work only after `commit`. `rollback`, or dropping the
/// transaction without committing, discards them.
#[async_trait]
pub trait Transaction: Send {
    type Members<'a>: MemberRepository
    where
        Self: 'a;
    type Items<'a>: ItemRepository
    where
        Self: 'a;
    type Orders<'a>: OrderRepository
    where
        Self: 'a;

    fn members(&mut self) -> Self::Members<'_>;

    fn items(&mut self) -> Self::Items<'_>;

    fn orders(&mut self) -> Self::Orders<'_>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Factory for units of work over one backing store.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Tx: Transaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

#[async_trait]
impl<U> UnitOfWork for Arc<U>
where
    U: UnitOfWork + ?Sized,
{
    type Tx = U::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }
}
