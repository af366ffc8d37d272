use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use bookstore_core::{Entity, ExpectedVersion, ItemId, MemberId, OrderId};
use bookstore_inventory::Item;
use bookstore_members::Member;
use bookstore_orders::{Order, OrderSearch};

use super::r#trait::{
    ItemRepository, MemberRepository, OrderRepository, StoreError, Transaction, UnitOfWork,
};

/// Full table set. Keys are UUIDv7, so map order is creation order.
#[derive(Debug, Clone, Default)]
struct Tables {
    members: BTreeMap<MemberId, Member>,
    items: BTreeMap<ItemId, Item>,
    orders: BTreeMap<OrderId, Order>,
}

#[derive(Debug, Default)]
struct Committed {
    tables: Tables,
    /// Bumped on every successful commit that wrote something.
    revision: u64,
}

/// In-memory store with snapshot units of work.
///
/// Each transaction works on a private copy of the tables and publishes it on
/// commit if no other transaction committed in between. Intended for
/// tests/dev. Not optimized for performance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Committed>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision of the committed state (number of writing commits so far).
    pub fn revision(&self) -> Result<u64, StoreError> {
        let committed = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(committed.revision)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let committed = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(InMemoryTransaction {
            store: Arc::clone(&self.inner),
            base_revision: committed.revision,
            staged: Staged {
                tables: committed.tables.clone(),
                dirty: false,
            },
        })
    }
}

#[derive(Debug)]
struct Staged {
    tables: Tables,
    dirty: bool,
}

/// Open unit of work over an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: Arc<RwLock<Committed>>,
    base_revision: u64,
    staged: Staged,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    type Members<'a> = InMemoryMembers<'a>;
    type Items<'a> = InMemoryItems<'a>;
    type Orders<'a> = InMemoryOrders<'a>;

    fn members(&mut self) -> Self::Members<'_> {
        InMemoryMembers {
            staged: &mut self.staged,
        }
    }

    fn items(&mut self) -> Self::Items<'_> {
        InMemoryItems {
            staged: &mut self.staged,
        }
    }

    fn orders(&mut self) -> Self::Orders<'_> {
        InMemoryOrders {
            staged: &mut self.staged,
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        if !self.staged.dirty {
            return Ok(());
        }

        let mut committed = self
            .store
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        ExpectedVersion::Exact(self.base_revision)
            .check(committed.revision)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        committed.tables = self.staged.tables;
        committed.revision += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn upsert<E>(table: &mut BTreeMap<E::Id, E>, entity: &E)
where
    E: Entity + Clone,
    E::Id: Ord,
{
    table.insert(*entity.id(), entity.clone());
}

pub struct InMemoryMembers<'a> {
    staged: &'a mut Staged,
}

#[async_trait]
impl MemberRepository for InMemoryMembers<'_> {
    async fn save(&mut self, member: &Member) -> Result<(), StoreError> {
        upsert(&mut self.staged.tables.members, member);
        self.staged.dirty = true;
        Ok(())
    }

    async fn find_one(&mut self, id: MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.staged.tables.members.get(&id).cloned())
    }

    async fn find_all(&mut self) -> Result<Vec<Member>, StoreError> {
        Ok(self.staged.tables.members.values().cloned().collect())
    }

    async fn find_by_name(&mut self, name: &str) -> Result<Vec<Member>, StoreError> {
        Ok(self
            .staged
            .tables
            .members
            .values()
            .filter(|m| m.name() == name)
            .cloned()
            .collect())
    }
}

pub struct InMemoryItems<'a> {
    staged: &'a mut Staged,
}

#[async_trait]
impl ItemRepository for InMemoryItems<'_> {
    async fn save(&mut self, item: &Item) -> Result<(), StoreError> {
        upsert(&mut self.staged.tables.items, item);
        self.staged.dirty = true;
        Ok(())
    }

    async fn find_one(&mut self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.staged.tables.items.get(&id).cloned())
    }

    async fn find_all(&mut self) -> Result<Vec<Item>, StoreError> {
        Ok(self.staged.tables.items.values().cloned().collect())
    }
}

pub struct InMemoryOrders<'a> {
    staged: &'a mut Staged,
}

#[async_trait]
impl OrderRepository for InMemoryOrders<'_> {
    async fn save(&mut self, order: &Order) -> Result<(), StoreError> {
        // Same foreign keys the Postgres schema enforces on orders and order_items.
        let tables = &self.staged.tables;
        if !tables.members.contains_key(&order.member_id()) {
            return Err(StoreError::Conflict(format!(
                "order {} references unknown member {}",
                order.id_typed(),
                order.member_id()
            )));
        }
        if let Some(line) = order
            .order_items()
            .iter()
            .find(|line| !tables.items.contains_key(&line.item_id()))
        {
            return Err(StoreError::Conflict(format!(
                "order {} references unknown item {}",
                order.id_typed(),
                line.item_id()
            )));
        }

        upsert(&mut self.staged.tables.orders, order);
        self.staged.dirty = true;
        Ok(())
    }

    async fn find_one(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.tables.orders.get(&id).cloned())
    }

    async fn find_all_by_order_status(
        &mut self,
        search: &OrderSearch,
    ) -> Result<Vec<Order>, StoreError> {
        let tables = &self.staged.tables;

        let mut found: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| {
                let member_name = tables
                    .members
                    .get(&order.member_id())
                    .map(|m| m.name())
                    .unwrap_or_default();
                search.matches(order, member_name)
            })
            .cloned()
            .collect();

        found.sort_by_key(|o| (o.order_date(), o.id_typed()));
        Ok(found)
    }
}
