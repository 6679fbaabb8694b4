// ============================================================================
// Product Catalog
// ============================================================================
//
// The catalog is owned by another service. We only ever ask it one thing:
// "give me id, price and name for these product ids".
//
// ============================================================================

mod resolver;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::order::ProductRecord;

pub use resolver::ProductResolver;

pub const VALIDATE_PRODUCTS: &str = "validate-products";

#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog did not reply within {0:?}")]
    Timeout(Duration),

    #[error("Catalog transport unavailable: {0}")]
    Transport(String),

    #[error("Catalog rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        product_ids: Vec<String>,
    },

    #[error("Malformed catalog reply: {0}")]
    Malformed(String),
}

/// Request/response access to the catalog service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// One round trip carrying every id.
    async fn validate_products(&self, ids: &[String]) -> Result<Vec<ProductRecord>, CatalogError>;
}
