//! Postgres-backed store implementation.
//!
//! Each unit of work is one SQL transaction; dropping a `PgTransaction`
//! without committing rolls it back.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate member name, concurrent insert |
//! | Database (foreign key violation) | `23503` | `Conflict` | Order references a missing member/item |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / Other | N/A | `Backend` | Network errors, connection failures, etc. |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use bookstore_core::{ItemId, MemberId, OrderId};
use bookstore_inventory::{Item, ItemDetails};
use bookstore_members::{Address, Member};
use bookstore_orders::{Delivery, DeliveryStatus, Order, OrderItem, OrderSearch, OrderStatus};

use super::r#trait::{
    ItemRepository, MemberRepository, OrderRepository, StoreError, Transaction, UnitOfWork,
};
use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Postgres-backed store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool for `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PgTransaction { tx })
    }
}

/// Open unit of work over a [`PgStore`].
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    type Members<'a> = PgMembers<'a>;
    type Items<'a> = PgItems<'a>;
    type Orders<'a> = PgOrders<'a>;

    fn members(&mut self) -> Self::Members<'_> {
        PgMembers { conn: &mut *self.tx }
    }

    fn items(&mut self) -> Self::Items<'_> {
        PgItems { conn: &mut *self.tx }
    }

    fn orders(&mut self) -> Self::Orders<'_> {
        PgOrders { conn: &mut *self.tx }
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

pub struct PgMembers<'a> {
    conn: &'a mut PgConnection,
}

#[async_trait]
impl MemberRepository for PgMembers<'_> {
    async fn save(&mut self, member: &Member) -> Result<(), StoreError> {
        let address = member.address();
        sqlx::query(
            r#"
            INSERT INTO members (id, name, city, street, zipcode)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                city = EXCLUDED.city,
                street = EXCLUDED.street,
                zipcode = EXCLUDED.zipcode
            "#,
        )
        .bind(member.id_typed().as_uuid())
        .bind(member.name())
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.zipcode.as_str()))
        .execute(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("save_member", e))?;
        Ok(())
    }

    async fn find_one(&mut self, id: MemberId) -> Result<Option<Member>, StoreError> {
        let row = sqlx::query("SELECT id, name, city, street, zipcode FROM members WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("find_member", e))?;

        row.as_ref().map(member_from_row).transpose()
    }

    async fn find_all(&mut self) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query("SELECT id, name, city, street, zipcode FROM members ORDER BY id")
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("list_members", e))?;

        rows.iter().map(member_from_row).collect()
    }

    async fn find_by_name(&mut self, name: &str) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, city, street, zipcode FROM members WHERE name = $1 ORDER BY id",
        )
        .bind(name)
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("find_members_by_name", e))?;

        rows.iter().map(member_from_row).collect()
    }
}

pub struct PgItems<'a> {
    conn: &'a mut PgConnection,
}

#[async_trait]
impl ItemRepository for PgItems<'_> {
    async fn save(&mut self, item: &Item) -> Result<(), StoreError> {
        let price = i64::try_from(item.price())
            .map_err(|_| StoreError::Encode(format!("price {} out of range", item.price())))?;

        sqlx::query(
            r#"
            INSERT INTO items (id, kind, name, price, stock_quantity, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET
                kind = EXCLUDED.kind,
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                stock_quantity = EXCLUDED.stock_quantity,
                details = EXCLUDED.details
            "#,
        )
        .bind(item.id_typed().as_uuid())
        .bind(item.details().kind())
        .bind(item.name())
        .bind(price)
        .bind(item.stock_quantity())
        .bind(Json(item.details()))
        .execute(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("save_item", e))?;
        Ok(())
    }

    async fn find_one(&mut self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price, stock_quantity, details FROM items WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("find_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_all(&mut self) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, price, stock_quantity, details FROM items ORDER BY id",
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(item_from_row).collect()
    }
}

pub struct PgOrders<'a> {
    conn: &'a mut PgConnection,
}

const ORDER_COLUMNS: &str = "o.id, o.member_id, o.status, o.order_date, \
     o.delivery_city, o.delivery_street, o.delivery_zipcode, o.delivery_status";

impl PgOrders<'_> {
    /// Attach lines to decoded order rows, keeping the row order.
    async fn hydrate(&mut self, rows: Vec<PgRow>) -> Result<Vec<Order>, StoreError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id").map_err(decode_error))
            .collect::<Result<Vec<_>, _>>()?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, item_id, order_price, order_count
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        let mut lines: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &line_rows {
            let order_id: Uuid = row.try_get("order_id").map_err(decode_error)?;
            lines.entry(order_id).or_default().push(order_item_from_row(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id").map_err(decode_error)?;
                order_from_row(row, lines.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for PgOrders<'_> {
    async fn save(&mut self, order: &Order) -> Result<(), StoreError> {
        let order_id = *order.id_typed().as_uuid();
        let delivery = order.delivery();
        let address = delivery.address.as_ref();

        sqlx::query(
            r#"
            INSERT INTO orders (
                id,
                member_id,
                status,
                order_date,
                delivery_city,
                delivery_street,
                delivery_zipcode,
                delivery_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id)
            DO UPDATE SET
                status = EXCLUDED.status,
                delivery_city = EXCLUDED.delivery_city,
                delivery_street = EXCLUDED.delivery_street,
                delivery_zipcode = EXCLUDED.delivery_zipcode,
                delivery_status = EXCLUDED.delivery_status
            "#,
        )
        .bind(order_id)
        .bind(order.member_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.order_date())
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.zipcode.as_str()))
        .bind(delivery.status.as_str())
        .execute(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        // Lines are owned by the order: replace them wholesale.
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("clear_order_items", e))?;

        for (idx, line) in order.order_items().iter().enumerate() {
            let order_price = i64::try_from(line.order_price()).map_err(|_| {
                StoreError::Encode(format!("order price {} out of range", line.order_price()))
            })?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, item_id, order_price, order_count)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind((idx + 1) as i32)
            .bind(line.item_id().as_uuid())
            .bind(order_price)
            .bind(line.count())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        Ok(())
    }

    async fn find_one(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("find_order", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_all_by_order_status(
        &mut self,
        search: &OrderSearch,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            JOIN members m ON m.id = o.member_id
            WHERE ($1::text IS NULL OR o.status = $1)
              AND ($2::text IS NULL OR strpos(m.name, $2) > 0)
            ORDER BY o.order_date, o.id
            "#
        ))
        .bind(search.order_status.map(|s| s.as_str()))
        .bind(search.member_name_filter())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("search_orders", e))?;

        self.hydrate(rows).await
    }
}

fn address_from_columns(
    city: Option<String>,
    street: Option<String>,
    zipcode: Option<String>,
) -> Option<Address> {
    match (city, street, zipcode) {
        (Some(city), Some(street), Some(zipcode)) => Some(Address {
            city,
            street,
            zipcode,
        }),
        _ => None,
    }
}

fn member_from_row(row: &PgRow) -> Result<Member, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let address = address_from_columns(
        row.try_get("city").map_err(decode_error)?,
        row.try_get("street").map_err(decode_error)?,
        row.try_get("zipcode").map_err(decode_error)?,
    );
    Ok(Member::from_parts(MemberId::from_uuid(id), name, address))
}

fn item_from_row(row: &PgRow) -> Result<Item, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let price: i64 = row.try_get("price").map_err(decode_error)?;
    let stock_quantity: i64 = row.try_get("stock_quantity").map_err(decode_error)?;
    let Json(details): Json<ItemDetails> = row.try_get("details").map_err(decode_error)?;

    let price = u64::try_from(price)
        .map_err(|_| StoreError::Decode(format!("negative price {price} for item {id}")))?;

    Ok(Item::from_parts(
        ItemId::from_uuid(id),
        name,
        price,
        stock_quantity,
        details,
    ))
}

fn order_item_from_row(row: &PgRow) -> Result<OrderItem, StoreError> {
    let item_id: Uuid = row.try_get("item_id").map_err(decode_error)?;
    let order_price: i64 = row.try_get("order_price").map_err(decode_error)?;
    let count: i64 = row.try_get("order_count").map_err(decode_error)?;

    let order_price = u64::try_from(order_price)
        .map_err(|_| StoreError::Decode(format!("negative order price {order_price}")))?;

    Ok(OrderItem::from_parts(
        ItemId::from_uuid(item_id),
        order_price,
        count,
    ))
}

fn order_from_row(row: &PgRow, order_items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let member_id: Uuid = row.try_get("member_id").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let order_date: DateTime<Utc> = row.try_get("order_date").map_err(decode_error)?;
    let delivery_status: String = row.try_get("delivery_status").map_err(decode_error)?;

    let status: OrderStatus = status
        .parse()
        .map_err(|e| StoreError::Decode(format!("order {id}: {e}")))?;
    let delivery_status: DeliveryStatus = delivery_status
        .parse()
        .map_err(|e| StoreError::Decode(format!("order {id}: {e}")))?;

    let delivery = Delivery {
        address: address_from_columns(
            row.try_get("delivery_city").map_err(decode_error)?,
            row.try_get("delivery_street").map_err(decode_error)?,
            row.try_get("delivery_zipcode").map_err(decode_error)?,
        ),
        status: delivery_status,
    };

    Ok(Order::from_parts(
        OrderId::from_uuid(id),
        MemberId::from_uuid(member_id),
        order_items,
        delivery,
        status,
        order_date,
    ))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Decode(err.to_string())
}

/// Map SQLx errors to store errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
