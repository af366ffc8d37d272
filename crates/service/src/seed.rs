//! Demo data: two members, each ordering two books.

use tracing::info;

use bookstore_inventory::Item;
use bookstore_members::{Address, Member};
use bookstore_core::OrderId;
use bookstore_infra::UnitOfWork;

use crate::error::ServiceResult;
use crate::order_service::OrderLine;
use crate::Services;

struct DemoCustomer {
    name: &'static str,
    city: &'static str,
    street: &'static str,
    zipcode: &'static str,
    // (title, price, stock, count)
    books: [(&'static str, u64, i64, i64); 2],
}

const CUSTOMERS: [DemoCustomer; 2] = [
    DemoCustomer {
        name: "userA",
        city: "Seoul",
        street: "1",
        zipcode: "1111",
        books: [("JPA1 BOOK", 10_000, 100, 1), ("JPA2 BOOK", 20_000, 100, 2)],
    },
    DemoCustomer {
        name: "userB",
        city: "Busan",
        street: "2",
        zipcode: "2222",
        books: [("SPRING1 BOOK", 20_000, 200, 3), ("SPRING2 BOOK", 40_000, 300, 4)],
    },
];

/// Load the demo members, books and orders.
///
/// Does nothing when the store already holds members, so restarting against
/// a persistent store is safe.
pub async fn seed_demo_data<U: UnitOfWork>(services: &Services<U>) -> ServiceResult<Vec<OrderId>> {
    if !services.members.find_members().await?.is_empty() {
        info!("store already holds members; skipping demo data");
        return Ok(Vec::new());
    }

    let mut order_ids = Vec::with_capacity(CUSTOMERS.len());
    for customer in &CUSTOMERS {
        let address = Address::new(customer.city, customer.street, customer.zipcode);
        let member_id = services
            .members
            .join(Member::new(customer.name, Some(address))?)
            .await?;

        let mut lines = Vec::with_capacity(customer.books.len());
        for (title, price, stock, count) in customer.books {
            let item_id = services
                .items
                .save_item(Item::book(title, price, stock, "kim", "978-89-0000-000-0")?)
                .await?;
            lines.push(OrderLine::new(item_id, count));
        }

        order_ids.push(services.orders.order_lines(member_id, &lines).await?);
    }

    info!(orders = order_ids.len(), "demo data loaded");
    Ok(order_ids)
}
