use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookstore_core::{DomainError, DomainResult, Entity, ItemId, MemberId, OrderId};
use bookstore_inventory::Item;
use bookstore_members::{Address, Member};

/// Order status lifecycle: `Order` → `Cancel`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Order,
    Cancel,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Order => "ORDER",
            OrderStatus::Cancel => "CANCEL",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER" => Ok(OrderStatus::Order),
            "CANCEL" => Ok(OrderStatus::Cancel),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Delivery status: `Ready` until shipped, `Comp` once delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Ready,
    Comp,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Ready => "READY",
            DeliveryStatus::Comp => "COMP",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(DeliveryStatus::Ready),
            "COMP" => Ok(DeliveryStatus::Comp),
            other => Err(DomainError::validation(format!(
                "unknown delivery status: {other}"
            ))),
        }
    }
}

/// Delivery of an order; owned by the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub address: Option<Address>,
    pub status: DeliveryStatus,
}

impl Delivery {
    /// A delivery waiting to ship to `address`.
    pub fn ready(address: Option<Address>) -> Self {
        Self {
            address,
            status: DeliveryStatus::Ready,
        }
    }
}

/// Order line: item, ordered count and the price at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    item_id: ItemId,
    /// Unit price snapshot in smallest currency unit (e.g., cents).
    order_price: u64,
    count: i64,
}

impl OrderItem {
    /// Take `count` units out of `item`'s stock and snapshot its price.
    ///
    /// On a stock shortage the item is left untouched and the error is
    /// `DomainError::NotEnoughStock`.
    pub fn create(item: &mut Item, count: i64) -> DomainResult<Self> {
        item.remove_stock(count)?;
        Ok(Self {
            item_id: item.id_typed(),
            order_price: item.price(),
            count,
        })
    }

    pub fn from_parts(item_id: ItemId, order_price: u64, count: i64) -> Self {
        Self {
            item_id,
            order_price,
            count,
        }
    }

    /// Return this line's quantity to `item`'s stock.
    pub fn cancel(&self, item: &mut Item) -> DomainResult<()> {
        if item.id_typed() != self.item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        item.add_stock(self.count)
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn order_price(&self) -> u64 {
        self.order_price
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// `order_price * count`; overflow is an invariant violation.
    pub fn total_price(&self) -> DomainResult<u64> {
        u64::try_from(self.count)
            .ok()
            .and_then(|count| self.order_price.checked_mul(count))
            .ok_or_else(|| DomainError::invariant("order line total overflows"))
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    member_id: MemberId,
    order_items: Vec<OrderItem>,
    delivery: Delivery,
    status: OrderStatus,
    order_date: DateTime<Utc>,
}

impl Order {
    /// Create a new order in status `Order`.
    ///
    /// Stock has already been taken by `OrderItem::create`; an order needs at
    /// least one line.
    pub fn create(
        member: &Member,
        delivery: Delivery,
        order_items: Vec<OrderItem>,
        order_date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if order_items.is_empty() {
            return Err(DomainError::validation("order must contain at least one line"));
        }

        Ok(Self {
            id: OrderId::new(),
            member_id: member.id_typed(),
            order_items,
            delivery,
            status: OrderStatus::Order,
            order_date,
        })
    }

    /// Rehydrate an order loaded from storage.
    pub fn from_parts(
        id: OrderId,
        member_id: MemberId,
        order_items: Vec<OrderItem>,
        delivery: Delivery,
        status: OrderStatus,
        order_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            member_id,
            order_items,
            delivery,
            status,
            order_date,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    /// Sum of `order_price * count` over all lines.
    pub fn total_price(&self) -> DomainResult<u64> {
        self.order_items.iter().try_fold(0u64, |acc, line| {
            acc.checked_add(line.total_price()?)
                .ok_or_else(|| DomainError::invariant("order total overflows"))
        })
    }

    /// Move the order to `Cancel` and return the lines whose stock must be
    /// restored.
    pub fn cancel(&mut self) -> DomainResult<&[OrderItem]> {
        if self.status == OrderStatus::Cancel {
            return Err(DomainError::invariant("order already cancelled"));
        }
        if self.delivery.status == DeliveryStatus::Comp {
            return Err(DomainError::invariant(
                "cannot cancel an order whose delivery is complete",
            ));
        }

        self.status = OrderStatus::Cancel;
        Ok(&self.order_items)
    }

    /// Mark the delivery as complete.
    pub fn complete_delivery(&mut self) -> DomainResult<()> {
        if self.status == OrderStatus::Cancel {
            return Err(DomainError::invariant("cannot deliver a cancelled order"));
        }
        if self.delivery.status == DeliveryStatus::Comp {
            return Err(DomainError::invariant("delivery already complete"));
        }

        self.delivery.status = DeliveryStatus::Comp;
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_member() -> Member {
        Member::new(
            "member1",
            Some(Address::new("Seoul", "Gangga", "123-123")),
        )
        .unwrap()
    }

    fn test_book(stock: i64) -> Item {
        Item::book("Country JPA", 10_000, stock, "Kim", "978-0000000000").unwrap()
    }

    fn place(member: &Member, item: &mut Item, count: i64) -> Order {
        let line = OrderItem::create(item, count).unwrap();
        let delivery = Delivery::ready(member.address().cloned());
        Order::create(member, delivery, vec![line], Utc::now()).unwrap()
    }

    #[test]
    fn placing_an_order_takes_stock_and_snapshots_price() {
        let member = test_member();
        let mut item = test_book(10);

        let order = place(&member, &mut item, 2);

        assert_eq!(order.status(), OrderStatus::Order);
        assert_eq!(order.member_id(), member.id_typed());
        assert_eq!(order.order_items().len(), 1);
        assert_eq!(order.order_items()[0].order_price(), 10_000);
        assert_eq!(order.total_price().unwrap(), 10_000 * 2);
        assert_eq!(item.stock_quantity(), 8);
        assert_eq!(order.delivery().status, DeliveryStatus::Ready);
        assert_eq!(order.delivery().address, member.address().cloned());
    }

    #[test]
    fn total_price_overflow_is_an_error() {
        let member = test_member();
        let line = OrderItem::from_parts(ItemId::new(), u64::MAX, 2);
        match line.total_price() {
            Err(DomainError::InvariantViolation(msg)) if msg.contains("overflows") => {}
            other => panic!("expected overflow error, got {other:?}"),
        }

        let lines = vec![
            OrderItem::from_parts(ItemId::new(), u64::MAX, 1),
            OrderItem::from_parts(ItemId::new(), 1, 1),
        ];
        let order = Order::create(&member, Delivery::ready(None), lines, Utc::now()).unwrap();
        match order.total_price() {
            Err(DomainError::InvariantViolation(msg)) if msg.contains("overflows") => {}
            other => panic!("expected overflow error, got {other:?}"),
        }
    }

    #[test]
    fn line_creation_fails_on_shortage() {
        let mut item = test_book(10);
        let err = OrderItem::create(&mut item, 11).unwrap_err();

        assert_eq!(err, DomainError::not_enough_stock(11, 10));
        assert_eq!(item.stock_quantity(), 10);
    }

    #[test]
    fn empty_order_is_rejected() {
        let member = test_member();
        let err = Order::create(&member, Delivery::ready(None), vec![], Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cancel_restores_stock_exactly() {
        let member = test_member();
        let mut item = test_book(10);
        let mut order = place(&member, &mut item, 2);

        let lines = order.cancel().unwrap().to_vec();
        for line in &lines {
            line.cancel(&mut item).unwrap();
        }

        assert_eq!(order.status(), OrderStatus::Cancel);
        assert_eq!(item.stock_quantity(), 10);
    }

    #[test]
    fn cancelling_twice_is_an_invariant_violation() {
        let member = test_member();
        let mut item = test_book(10);
        let mut order = place(&member, &mut item, 2);

        order.cancel().unwrap();
        let err = order.cancel().unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("already cancelled") => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
        assert_eq!(order.status(), OrderStatus::Cancel);
    }

    #[test]
    fn delivered_order_cannot_be_cancelled() {
        let member = test_member();
        let mut item = test_book(10);
        let mut order = place(&member, &mut item, 1);

        order.complete_delivery().unwrap();
        let err = order.cancel().unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(order.status(), OrderStatus::Order);
    }

    #[test]
    fn cancelled_order_cannot_be_delivered() {
        let member = test_member();
        let mut item = test_book(10);
        let mut order = place(&member, &mut item, 1);

        order.cancel().unwrap();
        assert!(order.complete_delivery().is_err());
        assert_eq!(order.delivery().status, DeliveryStatus::Ready);
    }

    #[test]
    fn line_cancel_rejects_foreign_item() {
        let mut item = test_book(10);
        let mut other = test_book(10);
        let line = OrderItem::create(&mut item, 1).unwrap();

        let err = line.cancel(&mut other).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(other.stock_quantity(), 10);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [OrderStatus::Order, OrderStatus::Cancel] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        for status in [DeliveryStatus::Ready, DeliveryStatus::Comp] {
            assert_eq!(status.as_str().parse::<DeliveryStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: total price is the sum of price * count over all lines.
        #[test]
        fn total_price_is_sum_of_lines(
            lines in prop::collection::vec((1u64..100_000, 1i64..50), 1..8)
        ) {
            let member = test_member();
            let order_items: Vec<OrderItem> = lines
                .iter()
                .map(|(price, count)| OrderItem::from_parts(ItemId::new(), *price, *count))
                .collect();
            let expected: u64 = lines.iter().map(|(p, c)| p * (*c as u64)).sum();

            let order = Order::create(&member, Delivery::ready(None), order_items, Utc::now()).unwrap();
            prop_assert_eq!(order.total_price().unwrap(), expected);
        }
    }
}
