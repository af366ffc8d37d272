//! Catalogue maintenance.

use tracing::{info, instrument};

use bookstore_core::{DomainError, ItemId};
use bookstore_infra::{ItemRepository, Transaction, UnitOfWork};
use bookstore_inventory::Item;

use crate::error::ServiceResult;
use crate::unit_of_work::finish;

/// New values for an existing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: String,
    pub price: u64,
    pub stock_quantity: i64,
}

pub struct ItemService<U> {
    uow: U,
}

impl<U: UnitOfWork> ItemService<U> {
    pub fn new(uow: U) -> Self {
        Self { uow }
    }

    /// Insert or replace `item`.
    #[instrument(skip(self, item), fields(item_id = %item.id_typed(), kind = item.details().kind()))]
    pub async fn save_item(&self, item: Item) -> ServiceResult<ItemId> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx.items().save(&item).await.map(|()| item.id_typed()).map_err(Into::into);
        if outcome.is_ok() {
            info!(stock = item.stock_quantity(), "item saved");
        }
        finish(tx, outcome).await
    }

    pub async fn find_items(&self) -> ServiceResult<Vec<Item>> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx.items().find_all().await.map_err(Into::into);
        finish(tx, outcome).await
    }

    pub async fn find_one(&self, item_id: ItemId) -> ServiceResult<Option<Item>> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx.items().find_one(item_id).await.map_err(Into::into);
        finish(tx, outcome).await
    }

    /// Change name, price and stock of an existing item.
    #[instrument(skip(self, update))]
    pub async fn update_item(&self, item_id: ItemId, update: ItemUpdate) -> ServiceResult<Item> {
        let mut tx = self.uow.begin().await?;
        let outcome = update_in(&mut tx, item_id, update).await;
        finish(tx, outcome).await
    }
}

async fn update_in<Tx: Transaction>(
    tx: &mut Tx,
    item_id: ItemId,
    update: ItemUpdate,
) -> ServiceResult<Item> {
    let mut item = tx
        .items()
        .find_one(item_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("item {item_id}")))?;

    item.update(update.name, update.price, update.stock_quantity)?;
    tx.items().save(&item).await?;
    info!("item updated");
    Ok(item)
}
