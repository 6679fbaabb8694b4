// ============================================================================
// Order Store
// ============================================================================
//
// Persistence boundary for orders and their line items.
// - postgres/  - sqlx-backed store, one transaction per created order
// - in_memory/ - process-local store for tests and local runs
//
// ============================================================================

mod in_memory;
mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::order::{Order, OrderItem, OrderPage, OrderStatus};

pub use in_memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Order {0} does not exist")]
    Missing(Uuid),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Database(error.to_string())
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order row and all item rows, or nothing.
    async fn create_with_items(
        &self,
        total_amount: Decimal,
        total_items: i32,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError>;

    async fn find_by_id_with_items(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Orders without their items, in creation order.
    async fn find_page(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<OrderPage, StoreError>;

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError>;
}
