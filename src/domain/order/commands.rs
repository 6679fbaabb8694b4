use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::errors::OrderError;
use super::value_objects::{LineItem, OrderStatus};

// ============================================================================
// Order Commands - inbound payloads, checked before they reach the workflow
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    #[validate(length(min = 1, message = "productId must not be empty"))]
    pub product_id: String,

    #[validate(range(min = 1, message = "quantity must be a positive integer"))]
    pub quantity: i32,
}

/// Create payload. Totals and status are derived, so they are not accepted here.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateOrderDto {
    #[validate(length(min = 1, message = "items must contain at least one entry"), nested)]
    pub items: Vec<OrderItemDto>,
}

impl CreateOrderDto {
    pub fn into_line_items(self) -> Result<Vec<LineItem>, OrderError> {
        self.validate()?;

        Ok(self
            .items
            .into_iter()
            .map(|item| LineItem {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect())
    }
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct OrderPaginationDto {
    #[serde(default)]
    pub status: Option<OrderStatus>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be a positive integer"))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, message = "limit must be a positive integer"))]
    pub limit: i64,
}

impl Default for OrderPaginationDto {
    fn default() -> Self {
        Self {
            status: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangeOrderStatusDto {
    pub id: Uuid,
    pub status: OrderStatus,
}

/// Order ids arrive as bare strings.
pub fn parse_order_id(raw: &str) -> Result<Uuid, OrderError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| OrderError::Validation(format!("Invalid order id '{}': {}", raw, e)))
}
