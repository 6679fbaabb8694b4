use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StoreError;

// ============================================================================
// Order Workflow Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Product catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Products not found: {}", .0.join(", "))]
    ProductNotFound(Vec<String>),

    #[error("No catalog record for product {0}")]
    ProductMismatch(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Order with id {0} not found")]
    NotFound(Uuid),
}

impl OrderError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "validation",
            OrderError::UpstreamUnavailable(_) => "upstream_unavailable",
            OrderError::ProductNotFound(_) => "product_not_found",
            OrderError::ProductMismatch(_) => "product_mismatch",
            OrderError::Store(_) => "store",
            OrderError::NotFound(_) => "not_found",
        }
    }

    pub fn status(&self) -> RpcStatus {
        match self {
            OrderError::Validation(_)
            | OrderError::UpstreamUnavailable(_)
            | OrderError::ProductNotFound(_)
            | OrderError::ProductMismatch(_) => RpcStatus::BadRequest,
            OrderError::NotFound(_) => RpcStatus::NotFound,
            OrderError::Store(_) => RpcStatus::InternalServerError,
        }
    }
}

impl From<validator::ValidationErrors> for OrderError {
    fn from(errors: validator::ValidationErrors) -> Self {
        OrderError::Validation(errors.to_string())
    }
}

/// Status classification carried by every failed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcStatus {
    BadRequest,
    NotFound,
    InternalServerError,
}

impl RpcStatus {
    pub fn code(&self) -> u16 {
        match self {
            RpcStatus::BadRequest => 400,
            RpcStatus::NotFound => 404,
            RpcStatus::InternalServerError => 500,
        }
    }
}

/// The single externally visible failure shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub status: u16,
    pub message: String,
}

impl From<&OrderError> for RpcError {
    fn from(error: &OrderError) -> Self {
        Self {
            status: error.status().code(),
            message: error.to_string(),
        }
    }
}

impl From<OrderError> for RpcError {
    fn from(error: OrderError) -> Self {
        RpcError::from(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct_from_bad_request() {
        let id = Uuid::new_v4();
        let rpc = RpcError::from(OrderError::NotFound(id));

        assert_eq!(rpc.status, 404);
        assert_eq!(rpc.message, format!("Order with id {} not found", id));
    }

    #[test]
    fn test_catalog_failures_are_bad_requests() {
        let errors = [
            OrderError::UpstreamUnavailable("timeout".to_string()),
            OrderError::ProductNotFound(vec!["A".to_string(), "B".to_string()]),
            OrderError::ProductMismatch("A".to_string()),
        ];

        for error in &errors {
            assert_eq!(RpcError::from(error).status, 400);
        }
        assert_eq!(errors[1].to_string(), "Products not found: A, B");
    }

    #[test]
    fn test_store_failure_is_internal() {
        let error = OrderError::from(StoreError::Database("connection reset".to_string()));
        assert_eq!(error.status(), RpcStatus::InternalServerError);
        assert_eq!(error.kind(), "store");
    }
}
