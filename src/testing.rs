// Test doubles shared by the workflow, resolver and actor tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::catalog::{CatalogClient, CatalogError};
use crate::domain::order::{Order, OrderItem, OrderPage, OrderStatus, ProductRecord};
use crate::store::{InMemoryOrderStore, OrderStore, StoreError};

/// Catalog that answers from a table, rejecting unknown ids the way the
/// real catalog does unless it is made lenient.
#[derive(Default)]
pub struct ScriptedCatalog {
    products: Mutex<HashMap<String, ProductRecord>>,
    failure: Mutex<Option<CatalogError>>,
    lenient: bool,
    calls: AtomicUsize,
    last_request: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(self, id: &str, price: i64, name: &str) -> Self {
        self.set_product(id, Decimal::from(price), name);
        self
    }

    /// Return only the known products instead of rejecting the request.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    pub fn failing(self, error: CatalogError) -> Self {
        self.set_failure(Some(error));
        self
    }

    pub fn set_product(&self, id: &str, price: Decimal, name: &str) {
        self.products.lock().unwrap().insert(
            id.to_string(),
            ProductRecord {
                id: id.to_string(),
                price,
                name: name.to_string(),
            },
        );
    }

    pub fn set_failure(&self, error: Option<CatalogError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Vec<String> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn validate_products(&self, ids: &[String]) -> Result<Vec<ProductRecord>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = ids.to_vec();

        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }

        let products = self.products.lock().unwrap();
        let unknown: Vec<String> = ids
            .iter()
            .filter(|id| !products.contains_key(*id))
            .cloned()
            .collect();

        if !unknown.is_empty() && !self.lenient {
            return Err(CatalogError::Rejected {
                status: 400,
                message: "Some products were not found".to_string(),
                product_ids: unknown,
            });
        }

        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}

/// In-memory store that counts writes and can be told to fail them.
#[derive(Default)]
pub struct SpyStore {
    pub inner: InMemoryOrderStore,
    creates: AtomicUsize,
    updates: AtomicUsize,
    fail_writes: Mutex<bool>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    fn write_guard(&self) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StoreError::Database("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for SpyStore {
    async fn create_with_items(
        &self,
        total_amount: Decimal,
        total_items: i32,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.write_guard()?;
        self.inner
            .create_with_items(total_amount, total_items, items)
            .await
    }

    async fn find_by_id_with_items(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_by_id_with_items(id).await
    }

    async fn find_page(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<OrderPage, StoreError> {
        self.inner.find_page(status, page, per_page).await
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.write_guard()?;
        self.inner.update_status(id, status).await
    }
}
