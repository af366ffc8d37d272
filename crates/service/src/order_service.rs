//! Order placement, cancellation and search.
//!
//! Every public call runs in its own unit of work: stock changes and the
//! order row are committed together or not at all.

use chrono::Utc;
use tracing::{info, instrument, warn};

use bookstore_core::{DomainError, ItemId, MemberId, OrderId};
use bookstore_infra::{
    ItemRepository, MemberRepository, OrderRepository, Transaction, UnitOfWork,
};
use bookstore_inventory::Item;
use bookstore_orders::{Delivery, Order, OrderItem, OrderSearch};

use crate::error::ServiceResult;
use crate::unit_of_work::finish;

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub count: i64,
}

impl OrderLine {
    pub fn new(item_id: ItemId, count: i64) -> Self {
        Self { item_id, count }
    }
}

pub struct OrderService<U> {
    uow: U,
}

impl<U: UnitOfWork> OrderService<U> {
    pub fn new(uow: U) -> Self {
        Self { uow }
    }

    /// Place a single-line order of `count` units of `item_id`.
    pub async fn order(
        &self,
        member_id: MemberId,
        item_id: ItemId,
        count: i64,
    ) -> ServiceResult<OrderId> {
        self.order_lines(member_id, &[OrderLine::new(item_id, count)])
            .await
    }

    /// Place one order covering all `lines`.
    ///
    /// If any line cannot be filled, no stock is taken for any of them.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn order_lines(
        &self,
        member_id: MemberId,
        lines: &[OrderLine],
    ) -> ServiceResult<OrderId> {
        let mut tx = self.uow.begin().await?;
        let outcome = place_in(&mut tx, member_id, lines).await;
        match &outcome {
            Ok(order_id) => info!(%order_id, "order placed"),
            Err(err) => warn!(error = %err, "order rejected"),
        }
        finish(tx, outcome).await
    }

    /// Cancel an order and put its stock back.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> ServiceResult<()> {
        let mut tx = self.uow.begin().await?;
        let outcome = cancel_in(&mut tx, order_id).await;
        match &outcome {
            Ok(()) => info!("order cancelled"),
            Err(err) => warn!(error = %err, "cancellation rejected"),
        }
        finish(tx, outcome).await
    }

    /// Mark the delivery of an order as complete.
    #[instrument(skip(self))]
    pub async fn complete_delivery(&self, order_id: OrderId) -> ServiceResult<()> {
        let mut tx = self.uow.begin().await?;
        let outcome = complete_in(&mut tx, order_id).await;
        match &outcome {
            Ok(()) => info!("delivery completed"),
            Err(err) => warn!(error = %err, "delivery completion rejected"),
        }
        finish(tx, outcome).await
    }

    /// Orders passing `search`, oldest first.
    pub async fn find_orders(&self, search: &OrderSearch) -> ServiceResult<Vec<Order>> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx
            .orders()
            .find_all_by_order_status(search)
            .await
            .map_err(Into::into);
        finish(tx, outcome).await
    }

    pub async fn find_one(&self, order_id: OrderId) -> ServiceResult<Option<Order>> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx.orders().find_one(order_id).await.map_err(Into::into);
        finish(tx, outcome).await
    }
}

async fn place_in<Tx: Transaction>(
    tx: &mut Tx,
    member_id: MemberId,
    lines: &[OrderLine],
) -> ServiceResult<OrderId> {
    let member = tx
        .members()
        .find_one(member_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("member {member_id}")))?;

    let mut order_items = Vec::with_capacity(lines.len());
    for line in lines {
        let mut item = load_item(tx, line.item_id).await?;
        order_items.push(OrderItem::create(&mut item, line.count)?);
        tx.items().save(&item).await?;
    }

    let delivery = Delivery::ready(member.address().cloned());
    let order = Order::create(&member, delivery, order_items, Utc::now())?;
    order.total_price()?;
    tx.orders().save(&order).await?;
    Ok(order.id_typed())
}

async fn cancel_in<Tx: Transaction>(tx: &mut Tx, order_id: OrderId) -> ServiceResult<()> {
    let mut order = load_order(tx, order_id).await?;
    let lines = order.cancel()?.to_vec();

    for line in &lines {
        let mut item = load_item(tx, line.item_id()).await?;
        line.cancel(&mut item)?;
        tx.items().save(&item).await?;
    }

    tx.orders().save(&order).await?;
    Ok(())
}

async fn complete_in<Tx: Transaction>(tx: &mut Tx, order_id: OrderId) -> ServiceResult<()> {
    let mut order = load_order(tx, order_id).await?;
    order.complete_delivery()?;
    tx.orders().save(&order).await?;
    Ok(())
}

async fn load_item<Tx: Transaction>(tx: &mut Tx, item_id: ItemId) -> ServiceResult<Item> {
    let item = tx
        .items()
        .find_one(item_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("item {item_id}")))?;
    Ok(item)
}

async fn load_order<Tx: Transaction>(tx: &mut Tx, order_id: OrderId) -> ServiceResult<Order> {
    let order = tx
        .orders()
        .find_one(order_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
    Ok(order)
}
