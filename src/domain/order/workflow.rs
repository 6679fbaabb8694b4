use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::ProductResolver;
use crate::metrics::Metrics;
use crate::store::OrderStore;

use super::aggregate::{compute_totals, snapshot_items, with_product_names};
use super::errors::OrderError;
use super::value_objects::{LineItem, Order, OrderPage, OrderStatus, OrderView, ProductRecord};

// ============================================================================
// Order Workflow
// ============================================================================
//
// create:        resolve → compute → persist → attach names
// find_one:      load → resolve → attach names
// find_all:      page straight from the store, no names
// change_status: find_one → skip if unchanged → update
//
// Nothing is written before the catalog has answered and totals are known.
// Each step short-circuits the rest on failure.
//
// ============================================================================

pub struct OrderWorkflow {
    store: Arc<dyn OrderStore>,
    resolver: ProductResolver,
    metrics: Arc<Metrics>,
}

impl OrderWorkflow {
    pub fn new(store: Arc<dyn OrderStore>, resolver: ProductResolver, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            resolver,
            metrics,
        }
    }

    pub async fn create(&self, items: Vec<LineItem>) -> Result<OrderView, OrderError> {
        let result = self.try_create(items).await;
        self.observe("create", result)
    }

    pub async fn find_one(&self, id: Uuid) -> Result<OrderView, OrderError> {
        let result = self
            .load_with_products(id)
            .await
            .and_then(|(order, products)| with_product_names(order, &products));
        self.observe("find_one", result)
    }

    pub async fn find_all(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, OrderError> {
        let result = self
            .store
            .find_page(status, page, limit)
            .await
            .map_err(OrderError::from);
        self.observe("find_all", result)
    }

    pub async fn change_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, OrderError> {
        let result = self.try_change_status(id, status).await;
        self.observe("change_status", result)
    }

    async fn try_create(&self, items: Vec<LineItem>) -> Result<OrderView, OrderError> {
        tracing::info!(item_count = items.len(), "Creating order");

        let products = self
            .resolver
            .resolve(items.iter().map(|item| item.product_id.as_str()))
            .await?;

        let totals = compute_totals(&items, &products)?;
        let snapshot = snapshot_items(&items, &products)?;

        let order = self
            .store
            .create_with_items(totals.total_amount, totals.total_items, snapshot)
            .await?;

        tracing::info!(
            order_id = %order.id,
            total_amount = %order.total_amount,
            total_items = order.total_items,
            "✅ Order created"
        );
        self.metrics.record_order_created();

        with_product_names(order, &products)
    }

    async fn try_change_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, OrderError> {
        let (order, products) = self.load_with_products(id).await?;

        if order.status == status {
            tracing::debug!(order_id = %id, status = %status, "Status unchanged, skipping write");
            return with_product_names(order, &products);
        }

        let previous = order.status;
        let updated = self.store.update_status(id, status).await?;

        tracing::info!(
            order_id = %id,
            from = %previous,
            to = %status,
            "Order status changed"
        );
        self.metrics.record_status_change(status.as_str());

        with_product_names(updated, &products)
    }

    /// Stored order plus the catalog records for its items. Names are not
    /// cached, so every load goes back to the catalog.
    async fn load_with_products(&self, id: Uuid) -> Result<(Order, Vec<ProductRecord>), OrderError> {
        let order = self
            .store
            .find_by_id_with_items(id)
            .await?
            .ok_or(OrderError::NotFound(id))?;

        let products = self
            .resolver
            .resolve(order.items.iter().map(|item| item.product_id.as_str()))
            .await?;

        Ok((order, products))
    }

    fn observe<T>(&self, operation: &str, result: Result<T, OrderError>) -> Result<T, OrderError> {
        if let Err(ref error) = result {
            match error {
                OrderError::ProductMismatch(_) => {
                    tracing::warn!(operation, error = %error, "Catalog reply inconsistent with order items")
                }
                _ => tracing::error!(operation, kind = error.kind(), error = %error, "Order operation failed"),
            }
            self.metrics.record_failure(operation, error.kind());
        }
        result
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
