use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderItem, OrderPage, OrderStatus, PageMeta};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// Tables:
//   orders      (id, total_amount, total_items, status, created_at, updated_at)
//   order_items (id, order_id -> orders ON DELETE CASCADE, product_id, quantity, price)
//
// An order and its items are written in one transaction. Money columns are
// unconstrained NUMERIC so catalog prices are stored at the scale received.
//
// ============================================================================

const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id           UUID PRIMARY KEY,
    total_amount NUMERIC NOT NULL CHECK (total_amount >= 0),
    total_items  INTEGER NOT NULL CHECK (total_items >= 0),
    status       TEXT NOT NULL DEFAULT 'PENDING'
                 CHECK (status IN ('PENDING', 'CONFIRMED', 'CANCELLED', 'DELIVERED')),
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_ORDER_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_items (
    id         UUID PRIMARY KEY,
    order_id   UUID NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
    product_id TEXT NOT NULL,
    quantity   INTEGER NOT NULL CHECK (quantity > 0),
    price      NUMERIC NOT NULL CHECK (price >= 0)
)
"#;

const CREATE_ORDER_ITEMS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS order_items_order_id_idx ON order_items (order_id)";

// Tables created with NUMERIC(12, 2) are widened in place.
const WIDEN_MONEY_COLUMNS: [&str; 2] = [
    "ALTER TABLE orders ALTER COLUMN total_amount TYPE NUMERIC",
    "ALTER TABLE order_items ALTER COLUMN price TYPE NUMERIC",
];

type OrderRow = (Uuid, Decimal, i32, String, DateTime<Utc>, DateTime<Utc>);
type ItemRow = (String, i32, Decimal);

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to Postgres");

        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in [
            CREATE_ORDERS_TABLE,
            CREATE_ORDER_ITEMS_TABLE,
            CREATE_ORDER_ITEMS_INDEX,
            WIDEN_MONEY_COLUMNS[0],
            WIDEN_MONEY_COLUMNS[1],
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::debug!("Order tables ready");
        Ok(())
    }

    async fn load_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            "SELECT product_id, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(item_from_row).collect())
    }
}

fn item_from_row((product_id, quantity, price): ItemRow) -> OrderItem {
    OrderItem {
        product_id,
        quantity,
        price,
    }
}

fn order_from_row(row: OrderRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let (id, total_amount, total_items, status, created_at, updated_at) = row;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}' on order {}", status, id)))?;

    Ok(Order {
        id,
        total_amount,
        total_items,
        status,
        created_at,
        updated_at,
        items,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_with_items(
        &self,
        total_amount: Decimal,
        total_items: i32,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        let order_id = Uuid::now_v7();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (id, total_amount, total_items, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, total_amount, total_items, status, created_at, updated_at",
        )
        .bind(order_id)
        .bind(total_amount)
        .bind(total_items)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut stored = Vec::with_capacity(items.len());
        for item in &items {
            let item_row = sqlx::query_as::<_, ItemRow>(
                "INSERT INTO order_items (id, order_id, product_id, quantity, price)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING product_id, quantity, price",
            )
            .bind(Uuid::now_v7())
            .bind(order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(item_from_row(item_row));
        }

        // Dropping the transaction before this point rolls every row back.
        tx.commit().await?;

        tracing::debug!(
            order_id = %order_id,
            item_count = stored.len(),
            "Order and items committed"
        );

        // Reply with what was persisted so it matches later reads.
        order_from_row(row, stored)
    }

    async fn find_by_id_with_items(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, total_amount, total_items, status, created_at, updated_at
             FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(id).await?;
                order_from_row(row, items).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn find_page(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<OrderPage, StoreError> {
        let status = status.map(|s| s.as_str());

        let (total,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, total_amount, total_items, status, created_at, updated_at
             FROM orders
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at, id
             OFFSET $2 LIMIT $3",
        )
        .bind(status)
        .bind(PageMeta::offset(page, per_page))
        .bind(per_page)
        .fetch_all(&self.pool)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| order_from_row(row, Vec::new()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OrderPage {
            data,
            meta: PageMeta::new(total, page, per_page),
        })
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET status = $2, updated_at = now()
             WHERE id = $1
             RETURNING id, total_amount, total_items, status, created_at, updated_at",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::Missing(id))?;

        let items = self.load_items(id).await?;
        order_from_row(row, items)
    }
}
