use bookstore_core::{DomainError, ItemId, MemberId, OrderId};
use bookstore_infra::InMemoryStore;
use bookstore_inventory::Item;
use bookstore_members::{Address, Member};
use bookstore_orders::{DeliveryStatus, OrderSearch, OrderStatus};
use bookstore_service::{OrderLine, ServiceError, Services};

fn test_services() -> Services<InMemoryStore> {
    Services::new(InMemoryStore::new())
}

async fn test_member(services: &Services<InMemoryStore>, name: &str) -> MemberId {
    let member = Member::new(name, Some(Address::new("Seoul", "River", "123-123"))).unwrap();
    services.members.join(member).await.unwrap()
}

async fn test_book(services: &Services<InMemoryStore>, price: u64, stock: i64) -> ItemId {
    let book = Item::book("JPA", price, stock, "kim", "1234").unwrap();
    services.items.save_item(book).await.unwrap()
}

async fn stock_of(services: &Services<InMemoryStore>, item_id: ItemId) -> i64 {
    services
        .items
        .find_one(item_id)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity()
}

async fn count_by_status(services: &Services<InMemoryStore>, status: OrderStatus) -> usize {
    services
        .orders
        .find_orders(&OrderSearch::by_status(status))
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn placing_an_order_takes_stock() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;

    let order_id = services.orders.order(member_id, item_id, 2).await.unwrap();

    let order = services.orders.find_one(order_id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Order);
    assert_eq!(order.member_id(), member_id);
    assert_eq!(order.order_items().len(), 1);
    assert_eq!(order.total_price().unwrap(), 20_000);
    assert_eq!(order.delivery().status, DeliveryStatus::Ready);
    assert_eq!(
        order.delivery().address,
        Some(Address::new("Seoul", "River", "123-123"))
    );
    assert_eq!(stock_of(&services, item_id).await, 8);
}

#[tokio::test]
async fn ordering_more_than_stock_fails_and_keeps_stock() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;

    let err = services.orders.order(member_id, item_id, 11).await.unwrap_err();
    match err {
        ServiceError::Domain(DomainError::NotEnoughStock {
            requested: 11,
            available: 10,
        }) => {}
        _ => panic!("expected not enough stock, got {err:?}"),
    }

    assert_eq!(stock_of(&services, item_id).await, 10);
    assert!(services
        .orders
        .find_orders(&OrderSearch::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn cancelling_restores_stock() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;
    let order_id = services.orders.order(member_id, item_id, 2).await.unwrap();

    services.orders.cancel_order(order_id).await.unwrap();

    let order = services.orders.find_one(order_id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Cancel);
    assert_eq!(stock_of(&services, item_id).await, 10);
}

#[tokio::test]
async fn search_by_status_follows_cancellation() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;
    let order_id = services.orders.order(member_id, item_id, 2).await.unwrap();

    assert_eq!(count_by_status(&services, OrderStatus::Order).await, 1);
    assert_eq!(count_by_status(&services, OrderStatus::Cancel).await, 0);

    services.orders.cancel_order(order_id).await.unwrap();

    assert_eq!(count_by_status(&services, OrderStatus::Order).await, 0);
    assert_eq!(count_by_status(&services, OrderStatus::Cancel).await, 1);
}

#[tokio::test]
async fn cancelling_twice_is_rejected() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;
    let order_id = services.orders.order(member_id, item_id, 2).await.unwrap();
    services.orders.cancel_order(order_id).await.unwrap();

    let err = services.orders.cancel_order(order_id).await.unwrap_err();
    match err {
        ServiceError::Domain(DomainError::InvariantViolation(msg))
            if msg.contains("already cancelled") => {}
        _ => panic!("expected re-cancel rejection, got {err:?}"),
    }

    // Stock is returned exactly once.
    assert_eq!(stock_of(&services, item_id).await, 10);
}

#[tokio::test]
async fn failing_line_rolls_back_the_whole_order() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let plenty = test_book(&services, 10_000, 10).await;
    let scarce = test_book(&services, 20_000, 1).await;

    let lines = [OrderLine::new(plenty, 3), OrderLine::new(scarce, 2)];
    let err = services.orders.order_lines(member_id, &lines).await.unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::NotEnoughStock { .. })
    ));

    assert_eq!(stock_of(&services, plenty).await, 10);
    assert_eq!(stock_of(&services, scarce).await, 1);
}

#[tokio::test]
async fn multi_line_order_sums_lines() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let first = test_book(&services, 10_000, 100).await;
    let second = test_book(&services, 20_000, 100).await;

    let lines = [OrderLine::new(first, 1), OrderLine::new(second, 2)];
    let order_id = services.orders.order_lines(member_id, &lines).await.unwrap();

    let order = services.orders.find_one(order_id).await.unwrap().unwrap();
    assert_eq!(order.order_items().len(), 2);
    assert_eq!(order.total_price().unwrap(), 50_000);
    assert_eq!(stock_of(&services, first).await, 99);
    assert_eq!(stock_of(&services, second).await, 98);
}

#[tokio::test]
async fn order_price_is_fixed_at_order_time() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;
    let order_id = services.orders.order(member_id, item_id, 1).await.unwrap();

    let update = bookstore_service::ItemUpdate {
        name: "JPA".into(),
        price: 99_000,
        stock_quantity: 9,
    };
    services.items.update_item(item_id, update).await.unwrap();

    let order = services.orders.find_one(order_id).await.unwrap().unwrap();
    assert_eq!(order.total_price().unwrap(), 10_000);
}

#[tokio::test]
async fn unknown_member_or_item_is_not_found() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;

    let err = services
        .orders
        .order(MemberId::new(), item_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));

    let err = services
        .orders
        .order(member_id, ItemId::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));

    let err = services.orders.cancel_order(OrderId::new()).await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::NotFound(_))));
}

#[tokio::test]
async fn non_positive_count_is_rejected() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;

    let err = services.orders.order(member_id, item_id, 0).await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));
    assert_eq!(stock_of(&services, item_id).await, 10);
}

#[tokio::test]
async fn delivered_order_cannot_be_cancelled() {
    let services = test_services();
    let member_id = test_member(&services, "userA").await;
    let item_id = test_book(&services, 10_000, 10).await;
    let order_id = services.orders.order(member_id, item_id, 2).await.unwrap();

    services.orders.complete_delivery(order_id).await.unwrap();
    let order = services.orders.find_one(order_id).await.unwrap().unwrap();
    assert_eq!(order.delivery().status, DeliveryStatus::Comp);

    let err = services.orders.cancel_order(order_id).await.unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::InvariantViolation(_))
    ));
    assert_eq!(stock_of(&services, item_id).await, 8);
}

#[tokio::test]
async fn search_by_member_name_and_date_order() {
    let services = test_services();
    let user_a = test_member(&services, "userA").await;
    let user_b = test_member(&services, "userB").await;
    let item_id = test_book(&services, 10_000, 10).await;

    let first = services.orders.order(user_a, item_id, 1).await.unwrap();
    let second = services.orders.order(user_b, item_id, 1).await.unwrap();
    let third = services.orders.order(user_a, item_id, 1).await.unwrap();

    let all = services
        .orders
        .find_orders(&OrderSearch::default())
        .await
        .unwrap();
    let ids: Vec<OrderId> = all.iter().map(|order| order.id_typed()).collect();
    assert_eq!(ids, [first, second, third]);

    let only_a = services
        .orders
        .find_orders(&OrderSearch::default().with_member_name("A"))
        .await
        .unwrap();
    let ids: Vec<OrderId> = only_a.iter().map(|order| order.id_typed()).collect();
    assert_eq!(ids, [first, third]);
}
