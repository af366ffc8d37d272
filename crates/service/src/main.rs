use anyhow::Context;
use tracing::info;

use bookstore_infra::{StoreConfig, UnitOfWork};
use bookstore_orders::OrderSearch;
use bookstore_service::{build_services, seed::seed_demo_data, AppServices, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bookstore_observability::init();

    let config = StoreConfig::from_env().context("invalid store configuration")?;
    let services = build_services(&config)
        .await
        .context("failed to open the store")?;

    match services {
        AppServices::InMemory(services) => run(&services).await,
        AppServices::Persistent(services) => run(&services).await,
    }
}

async fn run<U: UnitOfWork>(services: &Services<U>) -> anyhow::Result<()> {
    seed_demo_data(services)
        .await
        .context("failed to load demo data")?;

    for order in services.orders.find_orders(&OrderSearch::default()).await? {
        let member = services
            .members
            .find_one(order.member_id())
            .await?
            .map(|member| member.name().to_string())
            .unwrap_or_default();
        let total_price = order.total_price()?;

        info!(
            order_id = %order.id_typed(),
            %member,
            status = order.status().as_str(),
            delivery = order.delivery().status.as_str(),
            lines = order.order_items().len(),
            total_price,
            order_date = %order.order_date(),
            "order"
        );
    }

    Ok(())
}
