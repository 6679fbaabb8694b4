use std::collections::HashMap;

use rust_decimal::Decimal;

use super::errors::OrderError;
use super::value_objects::{LineItem, Order, OrderItem, OrderItemView, OrderView, ProductRecord};

// ============================================================================
// Order Aggregates - totals computed once at creation, then frozen
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub total_items: i32,
}

/// Products of a single request, indexed by id.
pub struct ProductIndex<'a> {
    by_id: HashMap<&'a str, &'a ProductRecord>,
}

impl<'a> ProductIndex<'a> {
    pub fn new(products: &'a [ProductRecord]) -> Self {
        Self {
            by_id: products.iter().map(|p| (p.id.as_str(), p)).collect(),
        }
    }

    pub fn get(&self, product_id: &str) -> Result<&'a ProductRecord, OrderError> {
        self.by_id
            .get(product_id)
            .copied()
            .ok_or_else(|| OrderError::ProductMismatch(product_id.to_string()))
    }
}

/// Sum `price × quantity` and `quantity` over every line.
pub fn compute_totals(
    items: &[LineItem],
    products: &[ProductRecord],
) -> Result<OrderTotals, OrderError> {
    let index = ProductIndex::new(products);

    items.iter().try_fold(
        OrderTotals {
            total_amount: Decimal::ZERO,
            total_items: 0,
        },
        |acc, item| {
            let product = index.get(&item.product_id)?;
            let total_amount = product
                .price
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| acc.total_amount.checked_add(line))
                .ok_or_else(|| OrderError::Validation("Order total is out of range".to_string()))?;
            let total_items = acc.total_items.checked_add(item.quantity).ok_or_else(|| {
                OrderError::Validation("Order item count is out of range".to_string())
            })?;

            Ok(OrderTotals {
                total_amount,
                total_items,
            })
        },
    )
}

/// Freeze the catalog price of each line into the item that gets persisted.
pub fn snapshot_items(
    items: &[LineItem],
    products: &[ProductRecord],
) -> Result<Vec<OrderItem>, OrderError> {
    let index = ProductIndex::new(products);

    items
        .iter()
        .map(|item| {
            let product = index.get(&item.product_id)?;
            Ok(OrderItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                price: product.price,
            })
        })
        .collect()
}

/// Attach catalog names to a stored order. Prices stay as stored.
pub fn with_product_names(order: Order, products: &[ProductRecord]) -> Result<OrderView, OrderError> {
    let index = ProductIndex::new(products);

    let items = order
        .items
        .into_iter()
        .map(|item| {
            let product = index.get(&item.product_id)?;
            Ok(OrderItemView {
                name: product.name.clone(),
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            })
        })
        .collect::<Result<Vec<_>, OrderError>>()?;

    Ok(OrderView {
        id: order.id,
        total_amount: order.total_amount,
        total_items: order.total_items,
        status: order.status,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items,
    })
}

/// Distinct product ids in first-seen order.
pub fn distinct_product_ids<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
