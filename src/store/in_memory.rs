use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderItem, OrderPage, OrderStatus, PageMeta};

/// Process-local order store. Orders are kept in creation order.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_with_items(
        &self,
        total_amount: Decimal,
        total_items: i32,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(),
            total_amount,
            total_items,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            items,
        };

        self.orders.write().await.push(order.clone());

        Ok(order)
    }

    async fn find_by_id_with_items(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|order| order.id == id).cloned())
    }

    async fn find_page(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<OrderPage, StoreError> {
        let orders = self.orders.read().await;

        let matching: Vec<&Order> = orders
            .iter()
            .filter(|order| status.is_none_or(|s| order.status == s))
            .collect();

        let total = matching.len() as i64;
        let offset = PageMeta::offset(page, per_page) as usize;

        let data = matching
            .into_iter()
            .skip(offset)
            .take(per_page.max(0) as usize)
            .map(|order| Order {
                items: Vec::new(),
                ..order.clone()
            })
            .collect();

        Ok(OrderPage {
            data,
            meta: PageMeta::new(total, page, per_page),
        })
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;

        let order = orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or(StoreError::Missing(id))?;

        order.status = status;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: i32, price: i64) -> OrderItem {
        OrderItem {
            product_id: product_id.to_string(),
            quantity,
            price: Decimal::from(price),
        }
    }

    #[tokio::test]
    async fn test_created_order_starts_pending_with_items() {
        let store = InMemoryOrderStore::new();
        let order = store
            .create_with_items(Decimal::from(20), 2, vec![item("A", 2, 10)])
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        let found = store.find_by_id_with_items(order.id).await.unwrap().unwrap();
        assert_eq!(found.items, vec![item("A", 2, 10)]);
    }

    #[tokio::test]
    async fn test_find_unknown_id_returns_none() {
        let store = InMemoryOrderStore::new();
        assert!(store.find_by_id_with_items(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pages_over_25_orders() {
        let store = InMemoryOrderStore::new();
        for _ in 0..25 {
            store
                .create_with_items(Decimal::from(10), 1, vec![item("A", 1, 10)])
                .await
                .unwrap();
        }

        let first = store.find_page(None, 1, 10).await.unwrap();
        assert_eq!(first.data.len(), 10);
        assert_eq!(first.meta.total, 25);
        assert_eq!(first.meta.last_page, 3);
        assert!(first.data.iter().all(|order| order.items.is_empty()));

        let last = store.find_page(None, 3, 10).await.unwrap();
        assert_eq!(last.data.len(), 5);
        assert_eq!(last.meta.page, 3);

        let beyond = store.find_page(None, 4, 10).await.unwrap();
        assert!(beyond.data.is_empty());
    }

    #[tokio::test]
    async fn test_page_filters_by_status() {
        let store = InMemoryOrderStore::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let order = store
                .create_with_items(Decimal::from(10), 1, vec![item("A", 1, 10)])
                .await
                .unwrap();
            ids.push(order.id);
        }
        store.update_status(ids[0], OrderStatus::Delivered).await.unwrap();

        let delivered = store.find_page(Some(OrderStatus::Delivered), 1, 10).await.unwrap();
        assert_eq!(delivered.meta.total, 1);
        assert_eq!(delivered.data[0].id, ids[0]);

        let pending = store.find_page(Some(OrderStatus::Pending), 1, 10).await.unwrap();
        assert_eq!(pending.meta.total, 3);
    }

    #[tokio::test]
    async fn test_update_missing_order_fails() {
        let store = InMemoryOrderStore::new();
        let result = store.update_status(Uuid::new_v4(), OrderStatus::Cancelled).await;
        assert!(matches!(result, Err(StoreError::Missing(_))));
    }
}
