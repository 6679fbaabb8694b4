// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, OrderItem, OrderStatus, ProductRecord, pages)
// - Commands (inbound DTOs and their validation)
// - Errors (OrderError and the RPC failure shape)
// - Aggregate (totals, price snapshot, name enrichment)
// - Workflow (OrderWorkflow orchestrating catalog and store)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod workflow;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use workflow::*;
